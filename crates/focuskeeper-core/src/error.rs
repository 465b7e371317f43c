//! Core error types for focuskeeper-core.
//!
//! Every fallible boundary of the library has its own `thiserror` enum;
//! [`CoreError`] ties them together for callers that only want one type.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerMode;

/// Core error type for focuskeeper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistent store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Timer operation rejected
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Session backend errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// The in-process lock guarding the store was poisoned
    #[error("Store lock poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Precondition failures of engine commands. The engine never mutates
/// state when it returns one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("operation not permitted while a run is active")]
    RunActive,

    #[error("operation not supported in {0:?} mode")]
    UnsupportedMode(TimerMode),

    #[error("manual duration must be between {min} and {max} minutes, got {got}")]
    InvalidDuration { min: u32, max: u32, got: u32 },

    #[error("focus rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("no session is awaiting a rating")]
    NoPendingSession,
}

/// Session submission errors.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Endpoint URL could not be built
    #[error("Invalid backend URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// HTTP transport failed
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend rejected session (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// No tokio runtime was available to drive submissions
    #[error("No async runtime available for session submission")]
    NoRuntime,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StoreError::Locked
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
