//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum ThesisDataError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// Mode string contains an unknown or repeated field.
    #[error("Invalid mode {mode:?}: {reason}")]
    InvalidMode {
        /// The mode string.
        mode: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Action outside of the action space of an environment.
    #[error("Invalid action {0}")]
    InvalidAction(String),

    /// Space that cannot be handled by the operation.
    #[error("Unsupported space: {0}")]
    UnsupportedSpace(String),

    /// Records of an episode disagree on the type or shape of a field.
    #[error("Inconsistent field {field:?}: {reason}")]
    InconsistentField {
        /// Name of the field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}
