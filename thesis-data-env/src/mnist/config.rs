//! Configuration of [`MnistEnv`](super::MnistEnv).
use super::MnistData;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

/// Configurations of [`MnistEnv`](super::MnistEnv).
///
/// It is deserialized from the keyword arguments of the environment, e.g.,
/// `{"num_actions": 3, "train": false}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MnistEnvConfig {
    /// The number of actions.
    pub num_actions: i64,

    /// If `true`, the training split is used, otherwise the test split.
    pub train: bool,

    /// The number of steps after which an episode is done.
    pub max_episode_length: usize,

    /// Directory of the MNIST files. Defaults to `~/.data/mnist`.
    pub data_dir: Option<PathBuf>,

    #[serde(skip)]
    pub(super) data: Option<Arc<MnistData>>,
}

impl Default for MnistEnvConfig {
    fn default() -> Self {
        Self {
            num_actions: 2,
            train: true,
            max_episode_length: 4096,
            data_dir: None,
            data: None,
        }
    }
}

impl MnistEnvConfig {
    /// Constructs the configuration from keyword arguments.
    pub fn from_kwargs(kwargs: &serde_json::Value) -> Result<Self> {
        match kwargs {
            serde_json::Value::Null => Ok(Self::default()),
            kwargs => serde_json::from_value(kwargs.clone())
                .context("Invalid keyword arguments of the MNIST environment"),
        }
    }

    /// Sets the number of actions.
    pub fn num_actions(mut self, v: i64) -> Self {
        self.num_actions = v;
        self
    }

    /// Sets the split.
    pub fn train(mut self, v: bool) -> Self {
        self.train = v;
        self
    }

    /// Sets the maximum length of an episode.
    pub fn max_episode_length(mut self, v: usize) -> Self {
        self.max_episode_length = v;
        self
    }

    /// Sets the data directory.
    pub fn data_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(v.into());
        self
    }

    /// Uses the given data instead of loading MNIST from disk.
    pub fn data(mut self, data: Arc<MnistData>) -> Self {
        self.data = Some(data);
        self
    }

    pub(super) fn resolve_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let mut dir = dirs::home_dir().context("Couldn't find home directory")?;
                dir.push(".data/mnist");
                Ok(dir)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_kwargs() -> Result<()> {
        let config = MnistEnvConfig::from_kwargs(&json!({"num_actions": 3, "train": false}))?;
        assert_eq!(config.num_actions, 3);
        assert!(!config.train);
        assert_eq!(config.max_episode_length, 4096);

        let config = MnistEnvConfig::from_kwargs(&json!({}))?;
        assert_eq!(config.num_actions, 2);

        assert!(MnistEnvConfig::from_kwargs(&json!({"n_actions": 3})).is_err());
        Ok(())
    }
}
