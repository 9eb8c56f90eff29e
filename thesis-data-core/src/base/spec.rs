//! Specification of an environment.
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Specification of an environment, as registered in gym.
///
/// Keys reported by an environment beyond the named fields are kept in
/// `extra` and written next to the named ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvSpec {
    /// Identifier of the environment, e.g., `CartPole-v1`.
    pub env_id: String,

    /// Entry point of the environment.
    #[serde(default)]
    pub entry_point: Option<String>,

    /// Reward threshold at which the task is considered solved.
    #[serde(default)]
    pub reward_threshold: Option<f64>,

    /// If `true`, the environment is not deterministic even with a fixed seed.
    #[serde(default)]
    pub nondeterministic: bool,

    /// The maximum number of steps of an episode.
    #[serde(default)]
    pub max_episode_steps: Option<usize>,

    /// Keyword arguments given to the constructor of the environment.
    #[serde(default)]
    pub kwargs: Mapping,

    /// Other keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EnvSpec {
    /// Creates a spec with the given identifier.
    pub fn new(env_id: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            ..Default::default()
        }
    }

    /// Sets the entry point.
    pub fn entry_point(mut self, v: impl Into<String>) -> Self {
        self.entry_point = Some(v.into());
        self
    }

    /// Sets the maximum number of steps of an episode.
    pub fn max_episode_steps(mut self, v: Option<usize>) -> Self {
        self.max_episode_steps = v;
        self
    }

    /// Sets the keyword arguments.
    pub fn kwargs(mut self, v: Mapping) -> Self {
        self.kwargs = v;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_keys_roundtrip() {
        let yaml = "env_id: CartPole-v1\n\
                    entry_point: gym.envs.classic_control:CartPoleEnv\n\
                    reward_threshold: 475.0\n\
                    max_episode_steps: 500\n\
                    order_enforce: true\n";
        let spec: EnvSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.env_id, "CartPole-v1");
        assert_eq!(spec.max_episode_steps, Some(500));
        assert!(!spec.nondeterministic);
        assert_eq!(spec.extra.get("order_enforce"), Some(&Value::Bool(true)));

        let spec_: EnvSpec = serde_yaml::from_str(&serde_yaml::to_string(&spec).unwrap()).unwrap();
        assert_eq!(spec, spec_);
    }
}
