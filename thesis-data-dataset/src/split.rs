//! Train, validation and test splits of a dataset.
use crate::INDEX_FILE;
use anyhow::{bail, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use walkdir::WalkDir;

/// A split of a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSplit {
    /// Training data.
    Train,

    /// Validation data.
    Validate,

    /// Test data.
    Test,
}

impl DataSplit {
    /// All splits.
    pub fn all() -> [Self; 3] {
        [Self::Train, Self::Validate, Self::Test]
    }

    /// Names of directories holding the split.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Train => &["train", "training"],
            Self::Validate => &["val", "validate", "validation"],
            Self::Test => &["test", "testing"],
        }
    }

    /// Name of the directory created for the split.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validate => "validate",
            Self::Test => "test",
        }
    }
}

impl FromStr for DataSplit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.to_lowercase();
        match Self::all().into_iter().find(|split| split.aliases().contains(&name.as_str())) {
            Some(split) => Ok(split),
            None => bail!("Unknown data split: {}, must be one of train, validate or test", s),
        }
    }
}

impl fmt::Display for DataSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Fractions of episodes in each split, used when a dataset has no split directories.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    /// Fraction of training episodes.
    pub train: f64,

    /// Fraction of validation episodes.
    pub validate: f64,

    /// Fraction of test episodes.
    pub test: f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self {
            train: 0.8,
            validate: 0.1,
            test: 0.1,
        }
    }
}

impl SplitFractions {
    /// Constructs fractions.
    pub fn new(train: f64, validate: f64, test: f64) -> Result<Self> {
        for (name, v) in [("train", train), ("validate", validate), ("test", test)] {
            if !(0.0..=1.0).contains(&v) {
                bail!("Fraction of {} must be in [0, 1], got {}", name, v);
            }
        }
        if validate + test > 1.0 {
            bail!("Fractions of validate and test sum to more than 1");
        }
        Ok(Self {
            train,
            validate,
            test,
        })
    }

    /// Split points of `n` sorted items: test is `[0, i)`, validate `[i, j)`, train `[j, n)`.
    fn split_points(&self, n: usize) -> (usize, usize) {
        let i = ((self.test * n as f64) as usize).min(n);
        let j = (((self.test + self.validate) * n as f64) as usize).clamp(i, n);
        (i, j)
    }
}

/// Episode directories of the splits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Splits {
    /// Training episodes.
    pub train: Vec<PathBuf>,

    /// Validation episodes.
    pub validate: Vec<PathBuf>,

    /// Test episodes.
    pub test: Vec<PathBuf>,
}

impl Splits {
    /// Episodes of a split.
    pub fn get(&self, split: DataSplit) -> &[PathBuf] {
        match split {
            DataSplit::Train => &self.train,
            DataSplit::Validate => &self.validate,
            DataSplit::Test => &self.test,
        }
    }

    /// The number of episodes in all splits.
    pub fn len(&self) -> usize {
        self.train.len() + self.validate.len() + self.test.len()
    }

    /// Returns `true` if no split has episodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Episode directories under `path`, at any depth, sorted.
///
/// An episode directory is one with an `episode.yaml`. Symbolic links are followed.
pub fn find_episodes(path: impl AsRef<Path>) -> Vec<PathBuf> {
    let mut episodes = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == INDEX_FILE)
        .filter_map(|e| e.path().parent().map(Path::to_path_buf))
        .collect::<Vec<_>>();
    episodes.sort();
    episodes
}

fn split_dir(dirs: &[PathBuf], split: DataSplit) -> Option<&PathBuf> {
    dirs.iter().find(|d| {
        d.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| split.aliases().contains(&n))
    })
}

/// Resolves the episodes of each split of a dataset.
///
/// If `path` has split directories, e.g., `train/` and `val/`, each split
/// takes the episodes found in its directory. Otherwise the sorted episodes
/// under `path` are divided by `fractions`, in the order test, validate,
/// train. Rounding goes in favour of the training split, which always
/// gets the remainder.
///
/// Fails if `path` does not exist, or if there are no training episodes.
pub fn resolve_splits(path: impl AsRef<Path>, fractions: &SplitFractions) -> Result<Splits> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("Dataset path {:?} doesn't exist", path);
    }

    let dirs = fs::read_dir(path)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect::<Vec<_>>();

    let mut splits = Splits::default();
    for split in DataSplit::all() {
        if let Some(dir) = split_dir(&dirs, split) {
            info!("Found data directory: {}", dir.display());
            let episodes = find_episodes(dir);
            match split {
                DataSplit::Train => splits.train = episodes,
                DataSplit::Validate => splits.validate = episodes,
                DataSplit::Test => splits.test = episodes,
            }
        }
    }

    if splits.is_empty() {
        let mut episodes = find_episodes(path);
        if episodes.is_empty() {
            bail!("No episodes found in {:?}", path);
        }
        info!("Found data directory: {}", path.display());
        let (i, j) = fractions.split_points(episodes.len());
        splits.train = episodes.split_off(j);
        splits.validate = episodes.split_off(i);
        splits.test = episodes;
    }

    for split in DataSplit::all() {
        debug!("{} episodes: {:?}", split, splits.get(split));
    }
    info!(
        "Found: {} episodes, {} train, {} validate, {} test",
        splits.len(),
        splits.train.len(),
        splits.validate.len(),
        splits.test.len()
    );

    if splits.train.is_empty() {
        bail!("No training episodes found in {:?}", path);
    }
    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn make_episodes(dir: &Path, n: usize) -> Result<()> {
        for i in 0..n {
            let ep = dir.join(format!("{:08}", i));
            fs::create_dir_all(&ep)?;
            fs::write(ep.join(INDEX_FILE), "length: 0\nfields: []\n")?;
        }
        Ok(())
    }

    #[test]
    fn test_parse_split() -> Result<()> {
        assert_eq!("training".parse::<DataSplit>()?, DataSplit::Train);
        assert_eq!("val".parse::<DataSplit>()?, DataSplit::Validate);
        assert_eq!("Validation".parse::<DataSplit>()?, DataSplit::Validate);
        assert_eq!("testing".parse::<DataSplit>()?, DataSplit::Test);
        assert!("dev".parse::<DataSplit>().is_err());
        Ok(())
    }

    #[test]
    fn test_split_directories() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new("splits")?;
        make_episodes(&dir.path().join("training"), 3)?;
        make_episodes(&dir.path().join("val"), 2)?;

        let splits = resolve_splits(dir.path(), &SplitFractions::default())?;
        assert_eq!(splits.train.len(), 3);
        assert_eq!(splits.validate.len(), 2);
        assert!(splits.test.is_empty());
        assert!(splits.train[0].starts_with(dir.path().join("training")));
        Ok(())
    }

    #[test]
    fn test_split_by_fractions() -> Result<()> {
        let dir = TempDir::new("splits")?;
        make_episodes(dir.path(), 10)?;

        let fractions = SplitFractions::new(0.7, 0.15, 0.15)?;
        let splits = resolve_splits(dir.path(), &fractions)?;
        assert_eq!(splits.test.len(), 1);
        assert_eq!(splits.validate.len(), 2);
        assert_eq!(splits.train.len(), 7);
        assert_eq!(splits.test[0], dir.path().join("00000000"));
        assert_eq!(splits.train[6], dir.path().join("00000009"));

        // a single episode always goes to train
        let dir = TempDir::new("splits")?;
        make_episodes(dir.path(), 1)?;
        let splits = resolve_splits(dir.path(), &fractions)?;
        assert_eq!(splits.train.len(), 1);
        Ok(())
    }

    #[test]
    fn test_no_episodes() -> Result<()> {
        let dir = TempDir::new("splits")?;
        assert!(resolve_splits(dir.path(), &SplitFractions::default()).is_err());
        assert!(resolve_splits(dir.path().join("missing"), &SplitFractions::default()).is_err());

        make_episodes(&dir.path().join("test"), 2)?;
        assert!(resolve_splits(dir.path(), &SplitFractions::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_fractions() {
        assert!(SplitFractions::new(0.5, 0.6, 0.0).is_err());
        assert!(SplitFractions::new(1.0, -0.1, 0.0).is_err());
        assert_eq!(SplitFractions::default().split_points(10), (1, 2));
    }
}
