//! Core functionalities.
mod env;
mod policy;
mod space;
mod spec;
mod step;
use crate::record::RecordValue;
pub use env::Env;
pub use policy::{Configurable, Policy};
pub use space::{Bound, Space};
pub use spec::EnvSpec;
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment.
pub trait Obs: Clone + Debug {
    /// Converts the observation into a value stored in a step record.
    fn to_record_value(&self) -> RecordValue;
}

/// An action of an environment.
pub trait Act: Clone + Debug {
    /// Converts the action into a value stored in a step record.
    fn to_record_value(&self) -> RecordValue;
}
