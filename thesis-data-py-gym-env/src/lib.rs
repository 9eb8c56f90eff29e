//! Environments of [OpenAI gym](https://github.com/openai/gym) and
//! [Gymnasium](https://gymnasium.farama.org) on Python.
//!
//! [`GymEnv`] is a wrapper of Python environments based on
//! [`PyO3`](https://github.com/PyO3/pyo3). Observations are converted to
//! [`ArrayObs`](thesis_data_core::ArrayObs) and actions are given as
//! [`GymAct`](thesis_data_core::GymAct), so any policy of
//! `thesis-data-policy` works with any environment.
//!
//! Besides interaction, [`GymEnv`] reads the description of the environment
//! from Python: its spec, spaces, wrappers and, for Atari games, the meanings
//! of the actions. These are written to the metadata of datasets.
//!
//! [`load_pretrained`] loads an agent of the stable-baselines3 zoo together
//! with the environment it was trained on.
//!
//! ```no_run
//! use anyhow::Result;
//! use thesis_data_core::Env;
//! use thesis_data_py_gym_env::{GymEnv, GymEnvConfig};
//!
//! fn main() -> Result<()> {
//!     let config = GymEnvConfig::default().name("CartPole-v1");
//!     let mut env = GymEnv::build(&config, 42)?;
//!     let (obs, _info) = env.reset()?;
//!     println!("{:?} {:?}", env.action_space(), obs.0.shape());
//!     Ok(())
//! }
//! ```
mod base;
mod config;
mod sb3;
pub mod util;
pub use base::GymEnv;
pub use config::GymEnvConfig;
pub use sb3::{find_checkpoint, load_pretrained, Sb3Config, Sb3Policy};
