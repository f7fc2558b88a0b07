//! Error types for the stats engine.
//!
//! Every variant here is a validation failure: the engine has no IO, so the
//! only thing that can go wrong is malformed input.

use thiserror::Error;

/// All possible errors from the stats engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid stored value for '{key}': {reason}")]
    InvalidStoredValue { key: String, reason: String },

    #[error("invalid offline queue: {0}")]
    InvalidQueue(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
