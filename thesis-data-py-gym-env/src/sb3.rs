//! Pretrained agents of the [stable-baselines3 zoo](https://github.com/DLR-RM/rl-baselines3-zoo).
//!
//! An agent and its environment are loaded from
//! `<models_dir>/<algo>/<env_id>_1/`, the layout of the zoo's `rl-trained-agents`.
//! The environment is created as in the zoo, with the saved hyperparameters
//! and environment wrappers, as a vectorized environment with a single
//! environment.
use crate::{
    util::{json_to_pydict, pyobj_to_arrayd, qualified_name},
    GymEnv, GymEnvConfig,
};
use anyhow::{bail, Context, Result};
use log::info;
use ndarray::Axis;
use numpy::PyArrayDyn;
use pyo3::{ffi::c_str, prelude::*, types::PyDict};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thesis_data_core::{ArrayObs, Env, GymAct, Policy, Space};
use walkdir::WalkDir;

/// Configuration of a pretrained agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sb3Config {
    /// Class of the agent, e.g., `stable_baselines3.PPO`.
    pub policy: String,

    /// Identifier of the environment.
    pub env_id: String,

    /// Directory of trained agents.
    pub models_dir: PathBuf,

    /// Keyword arguments of the environment, overriding those saved with the agent.
    #[serde(default)]
    pub kwargs: serde_json::Value,
}

impl Sb3Config {
    /// Constructs a configuration.
    pub fn new(policy: impl Into<String>, env_id: impl Into<String>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            policy: policy.into(),
            env_id: env_id.into(),
            models_dir: models_dir.into(),
            kwargs: serde_json::Value::Null,
        }
    }

    /// Sets the keyword arguments of the environment.
    pub fn kwargs(mut self, kwargs: serde_json::Value) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Name of the algorithm in lower case, e.g., `ppo`.
    pub fn algo(&self) -> String {
        self.policy
            .rsplit('.')
            .next()
            .unwrap_or(&self.policy)
            .to_lowercase()
    }

    /// Directory of the agent.
    pub fn agent_dir(&self) -> PathBuf {
        self.models_dir
            .join(self.algo())
            .join(format!("{}_1", self.env_id))
    }
}

/// Finds the checkpoint of an agent, the last `*.zip` file under `dir`.
pub fn find_checkpoint(dir: &Path) -> Result<PathBuf> {
    let mut checkpoints = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "zip"))
        .collect::<Vec<_>>();
    checkpoints.sort();
    checkpoints
        .pop()
        .with_context(|| format!("No checkpoint (*.zip) in {:?}", dir))
}

/// Agent of stable-baselines3, sampling actions with `model.predict()`.
pub struct Sb3Policy {
    model: PyObject,
    name: String,
    discrete: bool,
}

impl Sb3Policy {
    fn predict(&self, py: Python<'_>, obs: &ArrayObs) -> PyResult<GymAct> {
        let obs = PyArrayDyn::from_array(py, &obs.0.clone().insert_axis(Axis(0)));
        let kwargs = PyDict::new(py);
        kwargs.set_item("deterministic", false)?;
        let actions = self
            .model
            .bind(py)
            .call_method("predict", (obs,), Some(&kwargs))?
            .get_item(0)?;
        match self.discrete {
            true => Ok(GymAct::Discrete(actions.get_item(0)?.extract()?)),
            false => Ok(GymAct::Continuous(
                pyobj_to_arrayd(&actions)?.index_axis_move(Axis(0), 0),
            )),
        }
    }
}

impl Policy<GymEnv> for Sb3Policy {
    fn sample(&mut self, obs: &ArrayObs) -> Result<GymAct> {
        Ok(Python::with_gil(|py| self.predict(py, obs))?)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Loads a pretrained agent and the environment it was trained on.
///
/// The keyword arguments of the environment are those saved in `args.yml`
/// of the agent, overridden by `config.kwargs`.
pub fn load_pretrained(config: &Sb3Config, seed: i64) -> Result<(GymEnv, Sb3Policy)> {
    let path = config.agent_dir();
    if !path.is_dir() {
        bail!(
            "No pretrained agent {} for {} in {:?}",
            config.policy,
            config.env_id,
            path
        );
    }
    info!("Using SB3 path: {:?}", path);
    let stats_path = path.join(&config.env_id);
    let checkpoint = find_checkpoint(&path)?;
    info!("Using policy checkpoint: {:?}", checkpoint);

    Python::with_gil(|py| {
        let utils = py.import("rl_zoo3.utils")?;

        // Environment
        let kwargs = PyDict::new(py);
        kwargs.set_item("norm_reward", false)?;
        kwargs.set_item("test_mode", true)?;
        let (hyperparams, stats_path): (Bound<PyAny>, Bound<PyAny>) = utils
            .call_method(
                "get_saved_hyperparams",
                (stats_path.to_string_lossy().to_string(),),
                Some(&kwargs),
            )?
            .extract()?;

        let env_kwargs = PyDict::new(py);
        let args_path = path.join(&config.env_id).join("args.yml");
        if args_path.is_file() {
            let yaml = py.import("yaml")?;
            let text = std::fs::read_to_string(&args_path)?;
            let kwargs = PyDict::new(py);
            kwargs.set_item("Loader", yaml.getattr("UnsafeLoader")?)?;
            let args = yaml.call_method("load", (text,), Some(&kwargs))?;
            let saved = args.get_item("env_kwargs")?;
            if !saved.is_none() {
                env_kwargs.call_method1("update", (saved,))?;
            }
        }
        env_kwargs.call_method1("update", (json_to_pydict(py, &config.kwargs)?,))?;

        let kwargs = PyDict::new(py);
        kwargs.set_item("n_envs", 1)?;
        kwargs.set_item("stats_path", stats_path)?;
        kwargs.set_item("seed", seed)?;
        kwargs.set_item("log_dir", py.None())?;
        kwargs.set_item("should_render", false)?;
        kwargs.set_item("hyperparams", hyperparams)?;
        kwargs.set_item("env_kwargs", &env_kwargs)?;
        let env = utils.call_method("create_test_env", (config.env_id.as_str(),), Some(&kwargs))?;
        let env = GymEnv::from_pyobject(
            &env,
            GymEnvConfig::default().name(config.env_id.as_str()),
            seed,
        )?;

        // Agent
        let (module, class) = config
            .policy
            .rsplit_once('.')
            .with_context(|| format!("Invalid class name: {}", config.policy))?;
        let custom_objects = PyDict::new(py);
        custom_objects.set_item("learning_rate", 0.0)?;
        let zero = py.eval(c_str!("lambda _: 0.0"), None, None)?;
        custom_objects.set_item("lr_schedule", &zero)?;
        custom_objects.set_item("clip_range", &zero)?;
        let kwargs = PyDict::new(py);
        kwargs.set_item("custom_objects", custom_objects)?;
        kwargs.set_item("buffer_size", 1)?;
        let model = py.import(module)?.getattr(class)?.call_method(
            "load",
            (checkpoint.to_string_lossy().to_string(), env.py_env(py)),
            Some(&kwargs),
        )?;

        let policy = Sb3Policy {
            name: qualified_name(&model)?,
            model: model.unbind(),
            discrete: matches!(env.action_space(), Space::Discrete { .. }),
        };
        Ok((env, policy))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_agent_dir() {
        let config = Sb3Config::new("stable_baselines3.PPO", "CartPole-v1", "/models");
        assert_eq!(config.algo(), "ppo");
        assert_eq!(
            config.agent_dir(),
            PathBuf::from("/models/ppo/CartPole-v1_1")
        );
    }

    #[test]
    fn test_find_checkpoint() -> Result<()> {
        let dir = TempDir::new("sb3")?;
        assert!(find_checkpoint(dir.path()).is_err());

        let sub = dir.path().join("CartPole-v1");
        std::fs::create_dir_all(&sub)?;
        std::fs::write(sub.join("args.yml"), "")?;
        std::fs::write(dir.path().join("CartPole-v1.zip"), "")?;
        assert_eq!(find_checkpoint(dir.path())?, dir.path().join("CartPole-v1.zip"));
        Ok(())
    }
}
