//! Error types for refprune-core

use thiserror::Error;

/// Result type alias using refprune-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while parsing core values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Version text could not be parsed
    #[error("Invalid version '{0}': {1}")]
    InvalidVersion(String, String),

    /// Runtime train text could not be parsed (expected `major.minor`)
    #[error("Invalid runtime train '{0}'")]
    InvalidRuntimeTrain(String),
}
