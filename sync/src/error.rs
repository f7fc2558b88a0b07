//! Unified error handling for the sync layer.
//!
//! Remote failures carry a [`GatewayErrorKind`] so callers can tell "no data
//! yet" from "try again later". Nothing here reaches the UI as a fault: the
//! client entry points turn every error into a status value.

use serde::Serialize;
use std::fmt;

/// Classification used by the retry and status logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No row. A valid "first sync" signal, not a failure.
    NotFound,
    /// Network or remote unavailability. Retried through the offline queue.
    Transient,
    /// Remote rejected a write as conflicting.
    Conflict,
    /// Auth expired and could not be refreshed.
    SessionInvalid,
    /// Malformed local data.
    Validation,
    /// Local storage could not be read or written.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transient => "transient",
            ErrorKind::Conflict => "conflict",
            ErrorKind::SessionInvalid => "session_invalid",
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// The subset of kinds a remote call can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    NotFound,
    Transient,
    Conflict,
}

impl From<GatewayErrorKind> for ErrorKind {
    fn from(kind: GatewayErrorKind) -> Self {
        match kind {
            GatewayErrorKind::NotFound => ErrorKind::NotFound,
            GatewayErrorKind::Transient => ErrorKind::Transient,
            GatewayErrorKind::Conflict => ErrorKind::Conflict,
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ErrorKind::from(*self), f)
    }
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} remote error: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transient, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Conflict, message)
    }
}

/// Local storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("session is not valid")]
    SessionInvalid,

    #[error("invalid local data: {0}")]
    Validation(#[from] stats_engine::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Gateway(e) => e.kind.into(),
            SyncError::SessionInvalid => ErrorKind::SessionInvalid,
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Result type alias for the sync layer.
pub type Result<T> = std::result::Result<T, SyncError>;
