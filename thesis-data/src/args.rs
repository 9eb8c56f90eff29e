//! Command line arguments.
use crate::GenerateConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use thesis_data_dataset::{DataSplit, WriteMode};

/// Generates trajectory datasets from Gym environments.
///
/// Relative dataset paths are placed under `~/.data`, or under `--root`.
#[derive(Parser, Debug)]
#[command(name = "thesis-data", version, about)]
pub struct Args {
    /// Id of the environment, e.g., CartPole-v1 or MNIST-v0
    #[arg(long = "env-id", short = 'e', visible_alias = "env_id", required_unless_present = "config")]
    pub env_id: Option<String>,

    /// Path of the dataset, with placeholders {env_id}, {policy}, {mode} and {split}
    #[arg(long, short = 'p', default_value = "{env_id}/{policy}")]
    pub path: String,

    /// Policy: uniform, constant[:<action>], cycle, scripted:<yaml> or stable_baselines3.<ALGO>
    #[arg(long, short = 'b', default_value = "uniform")]
    pub policy: String,

    /// The number of episodes to generate
    #[arg(long = "num-episodes", short = 'n', visible_alias = "num_episodes", default_value_t = 1)]
    pub num_episodes: usize,

    /// The maximum number of steps of an episode
    #[arg(
        long = "max-episode-length",
        short = 'l',
        visible_alias = "max_episode_length",
        default_value_t = 10000
    )]
    pub max_episode_length: usize,

    /// Recording mode, letters of state, action, reward, done and info, e.g., sard
    #[arg(long, short = 'm', default_value = "sard")]
    pub mode: String,

    /// Append episodes to an existing dataset instead of replacing it
    #[arg(long, short = 'a', default_value_t = false)]
    pub append: bool,

    /// Keyword arguments of the environment as a JSON object, e.g., '{"num_actions": 3}'
    #[arg(long, short = 'k', default_value = "{}")]
    pub kwargs: String,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Root directory of relative dataset paths
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Data split of the episodes: train, validate or test
    #[arg(long)]
    pub split: Option<DataSplit>,

    /// Directory of pretrained stable-baselines3 agents
    #[arg(long = "models-dir")]
    pub models_dir: Option<PathBuf>,

    /// Anomaly injected into states, e.g., gaussian_blur
    #[arg(long)]
    pub anomaly: Option<String>,

    /// Probability of injecting the anomaly into a state
    #[arg(long = "anomaly-prob", default_value_t = 0.5)]
    pub anomaly_prob: f32,

    /// Load the run configuration from a YAML file; other arguments are ignored
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Save the run configuration to a YAML file
    #[arg(long = "save-config")]
    pub save_config: Option<PathBuf>,

    /// Show the run configuration and exit
    #[arg(long = "show-config", default_value_t = false)]
    pub show_config: bool,
}

impl Args {
    /// The run configuration given by the arguments.
    pub fn generate_config(&self) -> Result<GenerateConfig> {
        if let Some(path) = &self.config {
            return GenerateConfig::load(path)
                .with_context(|| format!("Couldn't load run configuration {:?}", path));
        }

        let kwargs = serde_json::from_str(&self.kwargs)
            .with_context(|| format!("Invalid keyword arguments {}", self.kwargs))?;
        let write_mode = match self.append {
            true => WriteMode::Append,
            false => WriteMode::Write,
        };

        let mut config = GenerateConfig::new(self.env_id.clone().unwrap_or_default())
            .path(&self.path)
            .policy(&self.policy)
            .num_episodes(self.num_episodes)
            .max_episode_length(self.max_episode_length)
            .mode(&self.mode)
            .write_mode(write_mode)
            .kwargs(kwargs)
            .split(self.split);
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if let Some(root) = &self.root {
            config = config.root(root);
        }
        if let Some(dir) = &self.models_dir {
            config = config.models_dir(dir);
        }
        if let Some(name) = &self.anomaly {
            config = config.anomaly(name, self.anomaly_prob);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let args = Args::try_parse_from(["thesis-data", "-e", "CartPole-v1"])?;
        let config = args.generate_config()?;
        assert_eq!(config, GenerateConfig::new("CartPole-v1"));
        Ok(())
    }

    #[test]
    fn test_arguments() -> Result<()> {
        let args = Args::try_parse_from([
            "thesis-data",
            "--env_id",
            "MNIST-v0",
            "-p",
            "mnist/{mode}",
            "-b",
            "cycle",
            "-n",
            "5",
            "-l",
            "20",
            "-m",
            "sa",
            "-a",
            "-k",
            r#"{"num_actions": 3}"#,
            "--split",
            "val",
            "--anomaly",
            "mask",
        ])?;
        let config = args.generate_config()?;
        assert_eq!(config.path, "mnist/{mode}");
        assert_eq!(config.policy, "cycle");
        assert_eq!(config.num_episodes, 5);
        assert_eq!(config.max_episode_length, 20);
        assert_eq!(config.write_mode, WriteMode::Append);
        assert_eq!(config.kwargs["num_actions"], 3);
        assert_eq!(config.split, Some(DataSplit::Validate));
        assert_eq!(config.anomaly.map(|a| a.prob), Some(0.5));
        Ok(())
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(Args::try_parse_from(["thesis-data"]).is_err());
        let args = Args::try_parse_from(["thesis-data", "-e", "A-v0", "-k", "{bad"]).unwrap();
        assert!(args.generate_config().is_err());
    }
}
