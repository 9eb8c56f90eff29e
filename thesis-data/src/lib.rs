//! Generation of trajectory datasets from the command line.
//!
//! ```text
//! thesis-data -e CartPole-v1 -b uniform -n 10 -m sard
//! thesis-data -e MNIST-v0 -n 100 -l 32 -k '{"num_actions": 3}' --split train
//! thesis-data -e BreakoutNoFrameskip-v4 -b stable_baselines3.PPO -n 5 --anomaly gaussian_blur
//! ```
//!
//! The arguments ([`Args`]) are turned into a [`GenerateConfig`], which can
//! be saved and loaded as YAML, and [`run`] generates the dataset.
mod args;
mod config;
mod run;
pub use args::Args;
pub use config::{AnomalyConfig, GenerateConfig};
pub use run::{run, Generated};
