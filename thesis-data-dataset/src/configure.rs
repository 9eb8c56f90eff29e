//! Metadata of the environment of a dataset, for consumers of datasets.
use crate::{download_from_kaggle, path::expand_home, symlinked, DataSplit, Meta, META_FILE};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

/// One or more strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single string.
    One(String),

    /// A list of strings.
    Many(Vec<String>),
}

impl OneOrMany {
    /// The strings as a list.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(v) => v.clone(),
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(vec![])
    }
}

/// Kaggle source of a dataset.
///
/// The split lists hold paths relative to the dataset directory, which are
/// linked into its `train`, `validate` and `test` directories.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KaggleConfig {
    /// Datasets, `<owner>/<dataset>`.
    pub urls: OneOrMany,

    /// If `true`, datasets are downloaded even if they exist.
    pub force: bool,

    /// Training data.
    pub train: Vec<PathBuf>,

    /// Validation data.
    pub validate: Vec<PathBuf>,

    /// Test data.
    pub test: Vec<PathBuf>,
}

impl KaggleConfig {
    /// Paths of a split, relative to the dataset directory.
    pub fn paths(&self, split: DataSplit) -> &[PathBuf] {
        match split {
            DataSplit::Train => &self.train,
            DataSplit::Validate => &self.validate,
            DataSplit::Test => &self.test,
        }
    }
}

/// Configuration of the environment of a dataset.
///
/// ```yaml
/// env_id: SpaceInvadersNoFrameskip-v4
/// path: ~/.data/SpaceInvaders
/// env_kwargs: {}
/// kaggle:
///   urls: [benedictwilkins/spaceinvaders]
///   force: false
///   train: [benedictwilkins/spaceinvaders/train]
///   test: [benedictwilkins/spaceinvaders/test]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Id of the environment.
    pub env_id: String,

    /// Directory of the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Keyword arguments of the environment.
    #[serde(default)]
    pub env_kwargs: serde_json::Value,

    /// Kaggle source of the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kaggle: Option<KaggleConfig>,
}

impl EnvironmentConfig {
    /// Constructs a configuration for an environment.
    pub fn new(env_id: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            ..Default::default()
        }
    }

    /// Sets the dataset directory.
    pub fn path(mut self, v: impl Into<PathBuf>) -> Self {
        self.path = Some(v.into());
        self
    }

    /// Loads a configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Couldn't open {:?}", path))?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }
}

/// Gets the metadata of the environment of a dataset.
///
/// 1. Without `path`, the metadata comes from `make_meta`, which builds the environment.
/// 2. With `kaggle`, the datasets are downloaded into `path` and the listed
///    paths are linked into the split directories.
/// 3. The first `meta.yaml` found under `path` is loaded.
/// 4. If there is none, the metadata from `make_meta` is written to `<path>/meta.yaml`.
pub fn configure_environment<F>(cfg: &EnvironmentConfig, make_meta: F) -> Result<Meta>
where
    F: FnOnce(&EnvironmentConfig) -> Result<Meta>,
{
    let path = match &cfg.path {
        None => return make_meta(cfg),
        Some(path) => expand_home(path)?,
    };

    if let Some(kaggle) = &cfg.kaggle {
        download_from_kaggle(&path, &kaggle.urls.to_vec(), kaggle.force)?;
        for split in DataSplit::all() {
            let paths = kaggle
                .paths(split)
                .iter()
                .map(|p| path.join(p))
                .collect::<Vec<_>>();
            symlinked(path.join(split.dir_name()), &paths, true)?;
        }
    }

    match Meta::find(&path).first() {
        Some(meta_path) => {
            debug!("Meta file {:?}", meta_path);
            Meta::load(meta_path)
        }
        None => {
            debug!(
                "Failed to find {}, creating it using environment {}",
                META_FILE, cfg.env_id
            );
            let meta = make_meta(cfg)?;
            fs::create_dir_all(&path)?;
            meta.save(path.join(META_FILE))?;
            Ok(meta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;
    use thesis_data_core::{
        dummy::{DummyEnv, DummyEnvConfig},
        Env,
    };

    fn dummy_meta(cfg: &EnvironmentConfig) -> Result<Meta> {
        let mut env = DummyEnv::build(&DummyEnvConfig::default(), 0)?;
        env.reset()?;
        let mut meta = Meta::from_env(&env);
        meta.spec.env_id = cfg.env_id.clone();
        env.close()?;
        Ok(meta)
    }

    #[test]
    fn test_without_path() -> Result<()> {
        let meta = configure_environment(&EnvironmentConfig::new("Dummy-v1"), dummy_meta)?;
        assert_eq!(meta.spec.env_id, "Dummy-v1");
        Ok(())
    }

    #[test]
    fn test_creates_and_finds_meta() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new("configure")?;
        let cfg = EnvironmentConfig::new("Dummy-v1").path(dir.path().join("data"));

        let meta = configure_environment(&cfg, dummy_meta)?;
        assert!(dir.path().join("data").join(META_FILE).is_file());

        // the file written before is found and make_meta is not called
        let found = configure_environment(&cfg, |_| anyhow::bail!("unexpected"))?;
        assert_eq!(found, meta);
        Ok(())
    }

    #[test]
    fn test_find_nested_meta() -> Result<()> {
        let dir = TempDir::new("configure")?;
        let nested = dir.path().join("train");
        fs::create_dir_all(&nested)?;
        let mut meta = dummy_meta(&EnvironmentConfig::new("Nested-v0"))?;
        meta.mode = Some("sa".to_string());
        meta.save(nested.join(META_FILE))?;

        let cfg = EnvironmentConfig::new("Other-v0").path(dir.path());
        assert_eq!(configure_environment(&cfg, dummy_meta)?, meta);
        Ok(())
    }

    #[test]
    fn test_parse_config() -> Result<()> {
        let cfg: EnvironmentConfig = serde_yaml::from_str(
            "env_id: A-v0\npath: /tmp/a\nkaggle:\n  urls: user/data\n  train: [user/data/train]\n",
        )?;
        let kaggle = cfg.kaggle.unwrap();
        assert_eq!(kaggle.urls.to_vec(), vec!["user/data".to_string()]);
        assert_eq!(kaggle.paths(DataSplit::Train), &[PathBuf::from("user/data/train")]);
        assert!(kaggle.paths(DataSplit::Test).is_empty());
        assert!(!kaggle.force);
        Ok(())
    }
}
