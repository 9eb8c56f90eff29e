//! Environments implemented in Rust.
//!
//! These environments do not need a Python interpreter. Currently the crate
//! provides [`MnistEnv`], registered as [`MNIST_ENV_ID`], in which a policy
//! moves between groups of MNIST digits.
//!
//! ```no_run
//! use anyhow::Result;
//! use thesis_data_core::{Env as _, GymAct};
//! use thesis_data_env::{MnistEnv, MnistEnvConfig};
//!
//! fn main() -> Result<()> {
//!     // Downloads MNIST into ~/.data/mnist if needed
//!     let mut env = MnistEnv::build(&MnistEnvConfig::default(), 42)?;
//!     let (_obs, info) = env.reset()?;
//!     let step = env.step(&GymAct::Discrete(1))?;
//!     println!("{:?} -> {:?}", info, step.info);
//!     Ok(())
//! }
//! ```
mod mnist;
pub use mnist::{MnistData, MnistEnv, MnistEnvConfig, MNIST_MIRROR};

/// Identifier of [`MnistEnv`].
pub const MNIST_ENV_ID: &str = "MNIST-v0";

/// Returns `true` if the environment is implemented in this crate.
pub fn is_native(env_id: &str) -> bool {
    env_id.eq_ignore_ascii_case(MNIST_ENV_ID) || env_id.eq_ignore_ascii_case("mnist")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_native() {
        assert!(is_native("MNIST-v0"));
        assert!(is_native("mnist"));
        assert!(!is_native("CartPole-v1"));
    }
}
