//! Metadata of a dataset.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};
use thesis_data_core::{Env, EnvSpec, EpisodeIterator, Policy, Space};
use thesis_data_transform::ImageConversion;
use walkdir::WalkDir;

/// Name of the metadata file of a dataset directory.
pub const META_FILE: &str = "meta.yaml";

/// Contents of `meta.yaml`.
///
/// ```yaml
/// spec:
///   env_id: CartPole-v1
///   entry_point: gym.envs.classic_control.cartpole:CartPoleEnv
///   reward_threshold: 475.0
///   nondeterministic: false
///   max_episode_steps: 500
///   kwargs: {}
/// wrappers:
///   - gym.wrappers.time_limit.TimeLimit
/// action_space:
///   type: Discrete
///   n: 2
///   start: 0
/// observation_space:
///   type: Box
///   ...
/// policy: thesis_data_policy::uniform::Uniform
/// mode: sard
/// num_episodes: 10
/// created: 2022-03-16T12:00:00+00:00
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Specification of the environment.
    pub spec: EnvSpec,

    /// Wrappers of the environment, outermost first.
    #[serde(default)]
    pub wrappers: Vec<String>,

    /// Action space.
    pub action_space: Space,

    /// Space of the recorded observations.
    pub observation_space: Space,

    /// Meanings of discrete actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_meanings: Option<Vec<String>>,

    /// Fully qualified name of the policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,

    /// Recording mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Transforms applied to the records, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<String>,

    /// The number of episodes in the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_episodes: Option<usize>,

    /// Time at which the metadata was written, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

impl Meta {
    /// Describes an environment.
    pub fn from_env<E: Env>(env: &E) -> Self {
        Self {
            spec: env.spec(),
            wrappers: env.wrappers(),
            action_space: env.action_space(),
            observation_space: env.observation_space(),
            action_meanings: env.action_meanings(),
            policy: None,
            mode: None,
            transforms: vec![],
            num_episodes: None,
            created: None,
        }
    }

    /// Describes the environment, policy and mode of an episode iterator.
    pub fn from_iterator<E: Env, P: Policy<E>>(iterator: &EpisodeIterator<E, P>) -> Self {
        let mut meta = Self::from_env(iterator.env());
        meta.policy = Some(iterator.policy().name());
        meta.mode = Some(iterator.mode().name().to_string());
        meta
    }

    /// Applies conversions of observations.
    ///
    /// The observation space becomes the space of converted observations.
    /// The conversions are listed as the outermost wrappers; the last one
    /// applied comes first.
    pub fn with_conversions(mut self, conversions: &[ImageConversion]) -> Self {
        for c in conversions.iter() {
            self.observation_space = c.convert_space(&self.observation_space);
        }
        let mut wrappers = conversions
            .iter()
            .rev()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>();
        wrappers.append(&mut self.wrappers);
        self.wrappers = wrappers;
        self
    }

    /// Sets the names of the record transforms.
    pub fn transforms(mut self, v: Vec<String>) -> Self {
        self.transforms = v;
        self
    }

    /// Sets the number of episodes.
    pub fn num_episodes(mut self, v: usize) -> Self {
        self.num_episodes = Some(v);
        self
    }

    /// Sets the creation time to now.
    pub fn created_now(mut self) -> Self {
        self.created = Some(chrono::Local::now().to_rfc3339());
        self
    }

    /// Loads metadata from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Couldn't open {:?}", path))?;
        let rdr = BufReader::new(file);
        let meta = serde_yaml::from_reader(rdr)
            .with_context(|| format!("Invalid dataset metadata {:?}", path))?;
        Ok(meta)
    }

    /// Saves metadata to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Paths of the metadata files under a directory, sorted.
    pub fn find(dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let mut paths = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == META_FILE)
            .map(|e| e.into_path())
            .collect::<Vec<_>>();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;
    use thesis_data_core::{
        dummy::{DummyEnv, DummyEnvConfig, DummyPolicy},
        Bound, Mode,
    };

    #[test]
    fn test_meta_of_iterator() -> Result<()> {
        let env = DummyEnv::build(&DummyEnvConfig::default().n_actions(3), 0)?;
        let iterator = EpisodeIterator::new(env, DummyPolicy::new(1), Mode::new("sard")?, 10);
        let meta = Meta::from_iterator(&iterator).num_episodes(2).created_now();

        assert_eq!(meta.spec.env_id, "Dummy-v0");
        assert_eq!(meta.mode.as_deref(), Some("sard"));
        assert!(meta.policy.as_deref().unwrap().ends_with("DummyPolicy"));

        let dir = TempDir::new("meta")?;
        let path = dir.path().join(META_FILE);
        meta.save(&path)?;
        let yaml = std::fs::read_to_string(&path)?;
        assert!(yaml.find("spec:").unwrap() < yaml.find("mode:").unwrap());
        assert!(!yaml.contains("action_meanings"));
        assert_eq!(Meta::load(&path)?, meta);
        Ok(())
    }

    #[test]
    fn test_with_conversions() -> Result<()> {
        let env = DummyEnv::build(&DummyEnvConfig::default(), 0)?;
        let mut meta = Meta::from_env(&env);
        meta.wrappers = vec!["gym.wrappers.time_limit.TimeLimit".to_string()];
        meta.observation_space = Space::Box {
            shape: vec![84, 84, 3],
            low: Bound::Scalar(0.0),
            high: Bound::Scalar(255.0),
            dtype: "uint8".to_string(),
        };

        let conversions = ImageConversion::for_space(&meta.observation_space);
        let meta = meta.with_conversions(&conversions);
        assert_eq!(
            meta.wrappers,
            vec![
                "thesis_data_transform::Chw",
                "thesis_data_transform::Float",
                "gym.wrappers.time_limit.TimeLimit"
            ]
        );
        assert_eq!(meta.observation_space.shape(), vec![3, 84, 84]);
        assert!(!meta.observation_space.has_integer_dtype());
        Ok(())
    }

    #[test]
    fn test_find() -> Result<()> {
        let dir = TempDir::new("meta")?;
        std::fs::create_dir_all(dir.path().join("b/train"))?;
        std::fs::create_dir_all(dir.path().join("a"))?;
        std::fs::write(dir.path().join("b/train").join(META_FILE), "")?;
        std::fs::write(dir.path().join("a").join(META_FILE), "")?;

        let found = Meta::find(dir.path());
        assert_eq!(
            found,
            vec![
                dir.path().join("a").join(META_FILE),
                dir.path().join("b/train").join(META_FILE)
            ]
        );
        Ok(())
    }
}
