//! Wrapper of gym environments implemented in Python.
use crate::{
    util::{
        act_to_pyobj, json_to_pydict, pydict_to_record, pyobj_to_arrayd, pyobj_to_yaml,
        qualified_name, space_from_py,
    },
    GymEnvConfig,
};
use anyhow::Result;
use log::{info, trace, warn};
use ndarray::Axis;
use pyo3::{
    exceptions::PyTypeError,
    ffi::c_str,
    prelude::*,
    types::{PyDict, PyTuple},
};
use serde_yaml::Value;
use thesis_data_core::{record::Record, ArrayObs, Env, EnvSpec, GymAct, Space, Step};

/// Key of the last observation of an episode in the info of stable-baselines3
/// vectorized environments, which reset automatically.
const TERMINAL_OBSERVATION: &str = "terminal_observation";

/// An environment in [OpenAI gym](https://github.com/openai/gym) or
/// [Gymnasium](https://gymnasium.farama.org).
///
/// Both the old step API, returning `(obs, reward, done, info)`, and the new
/// one, returning `(obs, reward, terminated, truncated, info)`, are
/// supported. `reset` may return either an observation or `(obs, info)`.
///
/// Vectorized environments with a single environment, as created by
/// stable-baselines3, are supported as well. Their batch dimension is
/// removed from observations and added to actions.
///
/// Observations are converted to `f32` arrays.
pub struct GymEnv {
    env: PyObject,
    config: GymEnvConfig,
    vectorized: bool,
    spec: EnvSpec,
    action_space: Space,
    observation_space: Space,
    action_meanings: Option<Vec<String>>,
    wrappers: Vec<String>,
    count_steps: usize,

    /// Initial seed.
    ///
    /// This value will be used at the first call of the reset method.
    initial_seed: Option<i64>,
}

impl GymEnv {
    /// Wraps an environment created in Python.
    ///
    /// `seed` is used at the first reset.
    pub fn from_pyobject(env: &Bound<'_, PyAny>, config: GymEnvConfig, seed: i64) -> Result<Self> {
        let vectorized = env.hasattr("num_envs")?;
        // For vectorized environments, the spec and wrappers of the single
        // environment are reported if it can be reached.
        let inner = match vectorized {
            true => match env.getattr("envs") {
                Ok(envs) => Some(envs.get_item(0)?),
                Err(_) => None,
            },
            false => Some(env.clone()),
        };

        let spec = match &inner {
            Some(inner) => env_spec(inner, &config.name)?,
            None => EnvSpec::new(config.name.as_str()),
        };
        let action_space = space_from_py(&env.getattr("action_space")?)?;
        let observation_space = space_from_py(&env.getattr("observation_space")?)?;
        let action_meanings = match &inner {
            Some(inner) => action_meanings(inner)?,
            None => None,
        };
        let mut wrappers = vec_env_wrappers(env)?;
        if let Some(inner) = &inner {
            wrappers.extend(env_wrappers(inner)?);
        }

        info!("Environment: {}", spec.env_id);
        info!("Action space = {:?}", action_space);
        info!("Observation space = {:?}", observation_space);

        Ok(Self {
            env: env.clone().unbind(),
            config,
            vectorized,
            spec,
            action_space,
            observation_space,
            action_meanings,
            wrappers,
            count_steps: 0,
            initial_seed: Some(seed),
        })
    }

    /// The environment object in Python.
    pub fn py_env<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.env.bind(py)
    }

    /// Returns `true` if this wraps a vectorized environment.
    pub fn is_vectorized(&self) -> bool {
        self.vectorized
    }

    /// Converts an observation, removing the batch dimension of vectorized
    /// environments.
    fn obs(&self, obs: &Bound<'_, PyAny>) -> PyResult<ArrayObs> {
        let obs = pyobj_to_arrayd(obs)?;
        if self.vectorized && obs.ndim() > 0 {
            Ok(ArrayObs(obs.index_axis_move(Axis(0), 0)))
        } else {
            Ok(ArrayObs(obs))
        }
    }

    /// First element of a batch, for vectorized environments.
    fn unbatch<'py>(&self, obj: Bound<'py, PyAny>) -> PyResult<Bound<'py, PyAny>> {
        match self.vectorized {
            true => obj.get_item(0),
            false => Ok(obj),
        }
    }

    fn reset_py(&mut self, py: Python<'_>) -> PyResult<(ArrayObs, Record)> {
        let env = self.env.bind(py);
        let ret = match self.initial_seed.take() {
            Some(seed) if !self.vectorized => {
                let kwargs = PyDict::new(py);
                kwargs.set_item("seed", seed)?;
                match env.call_method("reset", (), Some(&kwargs)) {
                    Ok(ret) => ret,
                    // gym < 0.22 has no seed argument
                    Err(e) if e.is_instance_of::<PyTypeError>(py) => {
                        env.call_method1("seed", (seed,))?;
                        env.call_method0("reset")?
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(seed) => {
                env.call_method1("seed", (seed,))?;
                env.call_method0("reset")?
            }
            None => env.call_method0("reset")?,
        };

        let (obs, info) = match ret.downcast::<PyTuple>() {
            Ok(t) if t.len() == 2 && !self.vectorized => {
                (t.get_item(0)?, pydict_to_record(&t.get_item(1)?)?)
            }
            _ => (ret.clone(), Record::empty()),
        };
        self.count_steps = 0;
        Ok((self.obs(&obs)?, info))
    }

    fn step_py(&mut self, py: Python<'_>, a: &GymAct) -> PyResult<Step<Self>> {
        let env = self.env.bind(py);
        let act = act_to_pyobj(py, a, self.vectorized)?;
        let ret = env.call_method1("step", (act,))?;
        let ret = ret.downcast::<PyTuple>()?;

        let (obs, reward, terminated, truncated, info) = match ret.len() {
            5 => {
                let info = self.unbatch(ret.get_item(4)?)?;
                (
                    ret.get_item(0)?,
                    ret.get_item(1)?,
                    self.unbatch(ret.get_item(2)?)?.is_truthy()?,
                    self.unbatch(ret.get_item(3)?)?.is_truthy()?,
                    info,
                )
            }
            4 => {
                let info = self.unbatch(ret.get_item(3)?)?;
                let done = self.unbatch(ret.get_item(2)?)?.is_truthy()?;
                let truncated = match info.get_item("TimeLimit.truncated") {
                    Ok(v) => v.is_truthy()?,
                    Err(_) => false,
                };
                (ret.get_item(0)?, ret.get_item(1)?, done && !truncated, truncated, info)
            }
            n => {
                return Err(PyTypeError::new_err(format!(
                    "step() returned a tuple of length {}",
                    n
                )))
            }
        };

        // Vectorized environments reset at the end of an episode, the
        // observation after the last action is in the info.
        let obs = match info.get_item(TERMINAL_OBSERVATION) {
            Ok(terminal) if self.vectorized && (terminated || truncated) => {
                ArrayObs(pyobj_to_arrayd(&terminal)?)
            }
            _ => self.obs(&obs)?,
        };
        if let Ok(dict) = info.downcast::<PyDict>() {
            if dict.contains(TERMINAL_OBSERVATION)? {
                dict.del_item(TERMINAL_OBSERVATION)?;
            }
        }
        let reward = pyobj_to_arrayd(&reward)?.iter().copied().next().unwrap_or(0.0);
        let info = pydict_to_record(&info)?;

        self.count_steps += 1;
        let truncated = match self.config.max_steps {
            Some(max_steps) if self.count_steps >= max_steps => true,
            _ => truncated,
        };

        Ok(Step::new(obs, a.clone(), reward, terminated, truncated, info))
    }
}

impl Env for GymEnv {
    type Config = GymEnvConfig;
    type Obs = ArrayObs;
    type Act = GymAct;
    type Info = Record;

    /// Creates the environment by `<module>.make()`.
    ///
    /// * `seed` - The seed value of the random number generator.
    ///   This value will be used at the first call of the reset method.
    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Python::with_gil(|py| {
            // sys.argv is used by pyglet library, which is responsible for rendering.
            // Depending on the python interpreter, however, sys.argv can be empty.
            let locals = PyDict::new(py);
            locals.set_item("sys", py.import("sys")?)?;
            py.run(c_str!("sys.argv.insert(0, 'thesis-data')"), None, Some(&locals))?;
            let ver = py.eval(c_str!("sys.version"), None, Some(&locals))?;
            info!("Initialize GymEnv");
            info!("Python version = {}", ver);

            let kwargs = json_to_pydict(py, &config.kwargs)?;
            if let Some(render_mode) = &config.render_mode {
                kwargs.set_item("render_mode", render_mode)?;
            }
            let env = py
                .import(config.module.as_str())?
                .call_method("make", (config.name.as_str(),), Some(&kwargs))?;
            Self::from_pyobject(&env, config.clone(), seed)
        })
    }

    fn reset(&mut self) -> Result<(ArrayObs, Record)> {
        trace!("GymEnv::reset()");
        Ok(Python::with_gil(|py| self.reset_py(py))?)
    }

    /// Resets the environment with the given index.
    ///
    /// Specifically, env.reset(seed=ix) is called in the Python interpreter.
    fn reset_with_index(&mut self, ix: usize) -> Result<(ArrayObs, Record)> {
        self.initial_seed = Some(ix as _);
        self.reset()
    }

    fn step(&mut self, a: &GymAct) -> Result<Step<Self>> {
        trace!("GymEnv::step()");
        Ok(Python::with_gil(|py| self.step_py(py, a))?)
    }

    fn close(&mut self) -> Result<()> {
        Python::with_gil(|py| self.env.call_method0(py, "close"))?;
        Ok(())
    }

    fn spec(&self) -> EnvSpec {
        self.spec.clone()
    }

    fn action_space(&self) -> Space {
        self.action_space.clone()
    }

    fn observation_space(&self) -> Space {
        self.observation_space.clone()
    }

    fn action_meanings(&self) -> Option<Vec<String>> {
        self.action_meanings.clone()
    }

    fn wrappers(&self) -> Vec<String> {
        self.wrappers.clone()
    }
}

/// Reads `env.spec`, falling back to a spec with the given name.
fn env_spec(env: &Bound<'_, PyAny>, name: &str) -> PyResult<EnvSpec> {
    let spec = env.getattr("spec")?;
    if spec.is_none() {
        return Ok(EnvSpec::new(name));
    }
    let mut mapping = match pyobj_to_yaml(&spec.getattr("__dict__")?)? {
        Value::Mapping(mapping) => mapping,
        _ => return Ok(EnvSpec::new(name)),
    };
    let env_id = spec.getattr("id")?.str()?.to_string();
    mapping.remove(&Value::from("id"));
    mapping.insert(Value::from("env_id"), Value::from(env_id.as_str()));

    match serde_yaml::from_value::<EnvSpec>(Value::Mapping(mapping)) {
        Ok(spec) => Ok(spec),
        Err(e) => {
            warn!("Failed to read the spec of {}: {}", env_id, e);
            Ok(EnvSpec::new(env_id))
        }
    }
}

/// Action meanings of Atari environments.
fn action_meanings(env: &Bound<'_, PyAny>) -> PyResult<Option<Vec<String>>> {
    let env = match env.hasattr("get_action_meanings")? {
        true => env.clone(),
        false => match env.getattr("unwrapped") {
            Ok(unwrapped) if unwrapped.hasattr("get_action_meanings")? => unwrapped,
            _ => return Ok(None),
        },
    };
    Ok(Some(env.call_method0("get_action_meanings")?.extract()?))
}

/// Wrappers of an environment, outermost first.
///
/// `Monitor` is left out and consecutive Atari wrappers are listed once.
fn env_wrappers(env: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    let mut wrappers: Vec<String> = vec![];
    let mut env = env.clone();
    while env.hasattr("env")? {
        let name = qualified_name(&env)?;
        let collapsed = name.contains("atari_wrappers")
            && wrappers.last().map_or(false, |w| w.contains("atari_wrappers"));
        if !name.ends_with(".Monitor") && !collapsed {
            wrappers.push(name);
        }
        env = env.getattr("env")?;
    }
    Ok(wrappers)
}

/// Wrappers of a vectorized environment, e.g., `VecFrameStack`, outermost first.
fn vec_env_wrappers(env: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    let mut wrappers = vec![];
    let mut env = env.clone();
    while env.hasattr("venv")? {
        wrappers.push(qualified_name(&env)?);
        env = env.getattr("venv")?;
    }
    Ok(wrappers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_data_core::{EpisodeIterator, Mode};
    use thesis_data_policy::Constant;

    // Needs a Python interpreter with gym.
    #[test]
    #[ignore]
    fn test_cartpole() -> Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = GymEnvConfig::default().name("CartPole-v1");
        let mut env = GymEnv::build(&config, 0)?;
        assert_eq!(env.action_space(), Space::discrete(2));
        assert_eq!(env.spec().env_id, "CartPole-v1");

        let (obs, _) = env.reset()?;
        assert_eq!(obs.0.shape(), &[4]);
        let step = env.step(&GymAct::Discrete(0))?;
        assert_eq!(step.obs.0.shape(), &[4]);
        assert_eq!(step.reward, 1.0);

        let policy = Constant::new(GymAct::Discrete(1));
        let mut iter = EpisodeIterator::new(env, policy, Mode::new("sard")?, 1000);
        let n = iter.episode()?.collect::<Result<Vec<_>>>()?.len();
        assert!(n > 0 && n < 1000);
        Ok(())
    }
}
