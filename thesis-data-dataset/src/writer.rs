//! Writer of datasets.
use crate::{Episode, Meta, META_FILE};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thesis_data_core::{
    record::BufferedRecorder, util::record_episodes, Env, EpisodeIterator, Policy,
};
use thesis_data_transform::{ImageConversion, RecordTransform};

/// What to do with episodes already in the dataset directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Keeps existing episodes and numbers new episodes after them.
    Append,

    /// Removes existing episodes and `meta.yaml`.
    Write,
}

impl FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "a" | "append" => Ok(Self::Append),
            "w" | "write" => Ok(Self::Write),
            _ => anyhow::bail!("Invalid write mode: {}, must be 'append' or 'write'", s),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Directory name of the episode with the given index.
pub fn episode_dir_name(ix: usize) -> String {
    format!("{:08}", ix)
}

/// Index of an episode directory, if the name is one.
///
/// Names are the digits written by [`episode_dir_name`], at least eight of
/// them; indices from `10^8` on have more.
pub fn parse_episode_dir_name(name: &str) -> Option<usize> {
    if name.len() < 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse()
        .ok()
        .filter(|ix| episode_dir_name(*ix) == name)
}

/// Episode directories directly under `path`, sorted by index.
pub fn episode_dirs(path: impl AsRef<Path>) -> Result<Vec<(usize, PathBuf)>> {
    let mut dirs = vec![];
    for entry in fs::read_dir(path.as_ref())? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(ix) = entry.file_name().to_str().and_then(parse_episode_dir_name) {
            dirs.push((ix, entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Writes episodes of an [`EpisodeIterator`] into a dataset directory.
///
/// ```text
/// <path>/
/// ├── 00000000/
/// ├── 00000001/
/// ├── ...
/// └── meta.yaml
/// ```
///
/// Before they are written, step records go through the image conversions
/// needed by the observation space (see [`ImageConversion::for_space`]) and
/// then through the record transforms, in the order they were added.
pub struct DatasetWriter {
    path: PathBuf,
    num_episodes: usize,
    transforms: Vec<Box<dyn RecordTransform>>,
}

impl DatasetWriter {
    /// Opens a dataset directory, creating it if needed.
    ///
    /// With [`WriteMode::Append`], new episodes are numbered after the
    /// existing ones. With [`WriteMode::Write`], existing episode directories
    /// and `meta.yaml` are removed; other files are kept.
    pub fn new(path: impl AsRef<Path>, mode: WriteMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path).with_context(|| format!("Couldn't create {:?}", path))?;

        let existing = episode_dirs(&path)?;
        let num_episodes = match mode {
            // One past the largest index; equals the number of episodes unless some were removed
            WriteMode::Append => existing.last().map_or(0, |(ix, _)| ix + 1),
            WriteMode::Write => {
                for (_, dir) in existing.iter() {
                    debug!("Remove {:?}", dir);
                    fs::remove_dir_all(dir)?;
                }
                let meta = path.join(META_FILE);
                if meta.is_file() {
                    fs::remove_file(meta)?;
                }
                0
            }
        };
        debug!("Dataset {:?}, {} existing episodes", path, num_episodes);

        Ok(Self {
            path,
            num_episodes,
            transforms: vec![],
        })
    }

    /// Adds a transform of step records.
    pub fn with_transform(mut self, transform: Box<dyn RecordTransform>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// The dataset directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of episodes in the dataset, i.e., the index of the next episode.
    pub fn num_episodes(&self) -> usize {
        self.num_episodes
    }

    /// Names of the record transforms.
    pub fn transform_names(&self) -> Vec<String> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Writes `n` episodes and returns their directories.
    pub fn write<E, P>(&mut self, iterator: &mut EpisodeIterator<E, P>, n: usize) -> Result<Vec<PathBuf>>
    where
        E: Env,
        P: Policy<E>,
    {
        let mut conversions = ImageConversion::for_space(&iterator.env().observation_space());
        let order = iterator
            .mode()
            .fields()
            .iter()
            .map(|f| f.key().to_string())
            .collect::<Vec<_>>();

        let mut paths = Vec::with_capacity(n);
        for _ in 0..n {
            let path = self.path.join(episode_dir_name(self.num_episodes));
            info!("Writing episode: {}", path.display());

            let mut buffer = BufferedRecorder::new();
            record_episodes(iterator, 1, &mut buffer)?;
            let mut records = Vec::with_capacity(buffer.len());
            for mut record in buffer.drain() {
                for c in conversions.iter_mut() {
                    record = c.apply(record)?;
                }
                for t in self.transforms.iter_mut() {
                    record = t.apply(record)?;
                }
                records.push(record);
            }

            Episode::from_records(&records, &order)?.save(&path)?;
            self.num_episodes += 1;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Writes `meta.yaml` describing the environment, policy and mode of the iterator.
    pub fn write_config<E, P>(&self, iterator: &EpisodeIterator<E, P>) -> Result<Meta>
    where
        E: Env,
        P: Policy<E>,
    {
        let conversions = ImageConversion::for_space(&iterator.env().observation_space());
        let meta = Meta::from_iterator(iterator)
            .with_conversions(&conversions)
            .transforms(self.transform_names())
            .num_episodes(self.num_episodes)
            .created_now();
        let path = self.path.join(META_FILE);
        meta.save(&path)?;
        info!("Wrote {}", path.display());
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;
    use thesis_data_core::{
        dummy::{DummyEnv, DummyEnvConfig, DummyPolicy},
        record::{Record, RecordValue},
        Mode,
    };

    fn iterator(mode: &str) -> Result<EpisodeIterator<DummyEnv, DummyPolicy>> {
        let env = DummyEnv::build(&DummyEnvConfig::default().episode_length(3), 0)?;
        Ok(EpisodeIterator::new(env, DummyPolicy::new(0), Mode::new(mode)?, 100))
    }

    struct Tag;

    impl RecordTransform for Tag {
        fn apply(&mut self, mut record: Record) -> Result<Record> {
            record.insert("tag", RecordValue::Bool(true));
            Ok(record)
        }

        fn name(&self) -> String {
            "Tag".to_string()
        }
    }

    #[test]
    fn test_write_episodes() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new("writer")?;
        let mut iterator = iterator("sard")?;

        let mut writer = DatasetWriter::new(dir.path(), WriteMode::Append)?.with_transform(Box::new(Tag));
        let paths = writer.write(&mut iterator, 2)?;
        assert_eq!(paths, vec![dir.path().join("00000000"), dir.path().join("00000001")]);

        let meta = writer.write_config(&iterator)?;
        assert_eq!(meta.num_episodes, Some(2));
        assert_eq!(meta.transforms, vec!["Tag".to_string()]);
        assert_eq!(Meta::load(dir.path().join(META_FILE))?, meta);

        let episode = Episode::load(&paths[1])?;
        assert_eq!(episode.len(), 3);
        let names = episode.fields().iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["state", "action", "reward", "done", "tag"]);
        let last = episode.record(2)?;
        assert!(last.get_bool("done")?);
        Ok(())
    }

    #[test]
    fn test_append_and_overwrite() -> Result<()> {
        let dir = TempDir::new("writer")?;
        let mut iterator = iterator("sa")?;
        fs::write(dir.path().join("notes.txt"), "keep")?;

        DatasetWriter::new(dir.path(), WriteMode::Append)?.write(&mut iterator, 2)?;
        let mut writer = DatasetWriter::new(dir.path(), WriteMode::Append)?;
        assert_eq!(writer.num_episodes(), 2);
        writer.write(&mut iterator, 1)?;
        writer.write_config(&iterator)?;
        assert_eq!(episode_dirs(dir.path())?.len(), 3);

        let writer = DatasetWriter::new(dir.path(), WriteMode::Write)?;
        assert_eq!(writer.num_episodes(), 0);
        assert!(episode_dirs(dir.path())?.is_empty());
        assert!(!dir.path().join(META_FILE).exists());
        assert!(dir.path().join("notes.txt").exists());
        Ok(())
    }

    #[test]
    fn test_append_after_gap() -> Result<()> {
        let dir = TempDir::new("writer")?;
        let mut iterator = iterator("sa")?;
        fs::create_dir(dir.path().join("00000000"))?;
        fs::create_dir(dir.path().join("00000005"))?;

        let mut writer = DatasetWriter::new(dir.path(), WriteMode::Append)?;
        assert_eq!(writer.num_episodes(), 6);
        let paths = writer.write(&mut iterator, 1)?;
        assert_eq!(paths, vec![dir.path().join("00000006")]);
        assert_eq!(episode_dirs(dir.path())?.len(), 3);
        Ok(())
    }

    #[test]
    fn test_episode_dir_names() {
        assert_eq!(episode_dir_name(12), "00000012");
        assert_eq!(parse_episode_dir_name("00000012"), Some(12));
        assert_eq!(parse_episode_dir_name("meta.yaml"), None);
        assert_eq!(parse_episode_dir_name("1234567"), None);
        assert_eq!(parse_episode_dir_name("123456789"), Some(123456789));
        assert_eq!(episode_dir_name(123456789), "123456789");
        assert_eq!(parse_episode_dir_name("012345678"), None);
        assert_eq!("a".parse::<WriteMode>().unwrap(), WriteMode::Append);
        assert!("x".parse::<WriteMode>().is_err());
    }
}
