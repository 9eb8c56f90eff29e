//! Environment.
use super::{Act, EnvSpec, Info, Obs, Space, Step};
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// Besides the interaction methods, an environment describes itself with
/// [`Env::spec`], its spaces and wrappers. These descriptions are written
/// to the metadata of a dataset.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Performes an environment step.
    fn step(&mut self, a: &Self::Act) -> Result<Step<Self>>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<(Self::Obs, Self::Info)>;

    /// Resets the environment with a given index.
    ///
    /// The index is used as a random seed.
    fn reset_with_index(&mut self, ix: usize) -> Result<(Self::Obs, Self::Info)>;

    /// Releases resources held by the environment.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Specification of the environment.
    fn spec(&self) -> EnvSpec;

    /// Action space.
    fn action_space(&self) -> Space;

    /// Observation space.
    fn observation_space(&self) -> Space;

    /// Human readable meanings of discrete actions, if the environment provides them.
    fn action_meanings(&self) -> Option<Vec<String>> {
        None
    }

    /// Fully qualified names of the wrappers applied to the environment,
    /// outermost first.
    fn wrappers(&self) -> Vec<String> {
        vec![]
    }
}
