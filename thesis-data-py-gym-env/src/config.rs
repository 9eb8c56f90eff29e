//! Configuration of [`GymEnv`](crate::GymEnv).
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration of [`GymEnv`](crate::GymEnv).
///
/// The environment is created by `<module>.make(name, render_mode=..., **kwargs)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GymEnvConfig {
    /// Identifier of the environment, e.g., `CartPole-v1`.
    pub name: String,

    /// Keyword arguments of `make`, a JSON object.
    pub kwargs: Value,

    /// Maximum number of steps of an episode, after which it is truncated.
    pub max_steps: Option<usize>,

    /// Render mode, e.g., `rgb_array`.
    pub render_mode: Option<String>,

    /// Python module providing `make`, `gym` or `gymnasium`.
    pub module: String,
}

impl Default for GymEnvConfig {
    fn default() -> Self {
        Self {
            name: "".to_string(),
            kwargs: Value::Object(Default::default()),
            max_steps: None,
            render_mode: None,
            module: "gym".to_string(),
        }
    }
}

impl GymEnvConfig {
    /// Sets the name of the environment.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the keyword arguments of `make`.
    pub fn kwargs(mut self, kwargs: Value) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Sets the maximum number of steps of an episode.
    pub fn max_steps(mut self, v: Option<usize>) -> Self {
        self.max_steps = v;
        self
    }

    /// Sets the render mode.
    pub fn render_mode(mut self, v: Option<String>) -> Self {
        self.render_mode = v;
        self
    }

    /// Sets the Python module providing `make`.
    pub fn module(mut self, v: impl Into<String>) -> Self {
        self.module = v.into();
        self
    }
}
