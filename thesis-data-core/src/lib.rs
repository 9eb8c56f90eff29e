#![warn(missing_docs)]
//! Core components for generating trajectory datasets from environments.
//!
//! This crate defines the traits shared by every environment and policy backend
//! ([`Env`], [`Policy`], [`Obs`], [`Act`], [`Info`]), the [`Step`] emitted by an
//! environment, the space and spec descriptors written to dataset metadata,
//! the [`record`] container, the recording [`Mode`], and the
//! [`EpisodeIterator`] that drives a policy through an environment.
pub mod dummy;
pub mod error;
pub mod record;
pub mod util;

mod array;
mod base;
mod iterator;
mod mode;
pub use array::{ArrayObs, GymAct};
pub use base::{
    Act, Bound, Configurable, Env, EnvSpec, Info, Obs, Policy, Space, Step,
};
pub use iterator::{Episode, EpisodeIterator};
pub use mode::{Field, Mode};
