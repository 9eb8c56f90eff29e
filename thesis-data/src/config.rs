//! Configuration of a run of the generator.
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};
use thesis_data_dataset::{DataSplit, PathTemplate, WriteMode};
use thesis_data_policy::PolicySpec;

/// Anomalies injected into the recorded states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Name of the anomaly transform, e.g., `gaussian_blur`.
    pub name: String,

    /// Probability with which the state of a step is transformed.
    pub prob: f32,
}

/// Configuration of [`run`](crate::run).
///
/// It can be saved to and loaded from a YAML file:
///
/// ```yaml
/// env_id: MNIST-v0
/// path: "{env_id}/{policy}"
/// policy: uniform
/// num_episodes: 10
/// max_episode_length: 10000
/// mode: sard
/// write_mode: write
/// kwargs: {}
/// seed: 42
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Id of the environment.
    pub env_id: String,

    /// Template of the dataset path, see [`PathTemplate`].
    pub path: String,

    /// Name of the policy, see [`PolicySpec`].
    pub policy: String,

    /// The number of episodes to generate.
    pub num_episodes: usize,

    /// The maximum number of steps of an episode.
    pub max_episode_length: usize,

    /// Recording mode, e.g., `sard`.
    pub mode: String,

    /// Whether episodes are appended to an existing dataset.
    pub write_mode: WriteMode,

    /// Keyword arguments of the environment, a JSON object.
    pub kwargs: serde_json::Value,

    /// Random seed of the environment, policy and transforms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Root directory of relative dataset paths. Defaults to `~/.data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Data split of the generated episodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<DataSplit>,

    /// Directory of pretrained agents. Defaults to `<root>/rl-trained-agents`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_dir: Option<PathBuf>,

    /// Anomalies injected into states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyConfig>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            env_id: String::new(),
            path: "{env_id}/{policy}".to_string(),
            policy: "uniform".to_string(),
            num_episodes: 1,
            max_episode_length: 10000,
            mode: "sard".to_string(),
            write_mode: WriteMode::Write,
            kwargs: serde_json::Value::Object(Default::default()),
            seed: None,
            root: None,
            split: None,
            models_dir: None,
            anomaly: None,
        }
    }
}

impl GenerateConfig {
    /// Constructs a configuration for an environment with default values.
    pub fn new(env_id: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            ..Default::default()
        }
    }

    /// Sets the path template.
    pub fn path(mut self, v: impl Into<String>) -> Self {
        self.path = v.into();
        self
    }

    /// Sets the policy.
    pub fn policy(mut self, v: impl Into<String>) -> Self {
        self.policy = v.into();
        self
    }

    /// Sets the number of episodes.
    pub fn num_episodes(mut self, v: usize) -> Self {
        self.num_episodes = v;
        self
    }

    /// Sets the maximum length of an episode.
    pub fn max_episode_length(mut self, v: usize) -> Self {
        self.max_episode_length = v;
        self
    }

    /// Sets the recording mode.
    pub fn mode(mut self, v: impl Into<String>) -> Self {
        self.mode = v.into();
        self
    }

    /// Sets the write mode.
    pub fn write_mode(mut self, v: WriteMode) -> Self {
        self.write_mode = v;
        self
    }

    /// Sets the keyword arguments of the environment.
    pub fn kwargs(mut self, v: serde_json::Value) -> Self {
        self.kwargs = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = Some(v);
        self
    }

    /// Sets the root directory.
    pub fn root(mut self, v: impl Into<PathBuf>) -> Self {
        self.root = Some(v.into());
        self
    }

    /// Sets the data split.
    pub fn split(mut self, v: Option<DataSplit>) -> Self {
        self.split = v;
        self
    }

    /// Sets the directory of pretrained agents.
    pub fn models_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.models_dir = Some(v.into());
        self
    }

    /// Sets the injected anomaly.
    pub fn anomaly(mut self, name: impl Into<String>, prob: f32) -> Self {
        self.anomaly = Some(AnomalyConfig {
            name: name.into(),
            prob,
        });
        self
    }

    /// Checks the values that do not depend on the environment.
    pub fn validate(&self) -> Result<()> {
        if self.env_id.is_empty() {
            bail!("Environment id must be given");
        }
        if !self.kwargs.is_object() && !self.kwargs.is_null() {
            bail!("Keyword arguments must be a JSON object, got {}", self.kwargs);
        }
        if let Some(anomaly) = &self.anomaly {
            if !(0.0..=1.0).contains(&anomaly.prob) {
                bail!("Anomaly probability must be in [0, 1], got {}", anomaly.prob);
            }
        }
        Ok(())
    }

    /// Template of the dataset path.
    pub fn path_template(&self, policy: &PolicySpec) -> PathTemplate {
        let template = PathTemplate::new(&self.path)
            .env_id(&self.env_id)
            .policy(policy.short_name())
            .mode(&self.mode)
            .split(self.split);
        match &self.root {
            Some(root) => template.root(root),
            None => template,
        }
    }

    /// Constructs [`GenerateConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`GenerateConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_generate_config() -> Result<()> {
        let config = GenerateConfig::new("MNIST-v0")
            .num_episodes(3)
            .seed(7)
            .split(Some(DataSplit::Test))
            .anomaly("mask", 0.5);

        let dir = TempDir::new("generate_config")?;
        let path = dir.path().join("config.yaml");
        config.save(&path)?;
        assert_eq!(GenerateConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_config() -> Result<()> {
        let config: GenerateConfig = serde_yaml::from_str("env_id: CartPole-v1\nmode: sa\n")?;
        assert_eq!(config.mode, "sa");
        assert_eq!(config.policy, "uniform");
        assert_eq!(config.num_episodes, 1);
        assert_eq!(config.write_mode, WriteMode::Write);
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(GenerateConfig::default().validate().is_err());
        assert!(GenerateConfig::new("A-v0").validate().is_ok());
        assert!(GenerateConfig::new("A-v0").kwargs(serde_json::json!([1])).validate().is_err());
        assert!(GenerateConfig::new("A-v0").anomaly("mask", 1.5).validate().is_err());
    }

    #[test]
    fn test_path_template() -> Result<()> {
        let config = GenerateConfig::new("CartPole-v1").root("/data");
        let path = config.path_template(&"stable_baselines3.PPO".parse()?).resolve()?;
        assert_eq!(path, PathBuf::from("/data/CartPole-v1/ppo"));
        Ok(())
    }
}
