//! Core error types for huckle-core.
//!
//! Connectivity errors never reach the presentation layer as errors: the
//! connection supervisor absorbs them into a state transition and records
//! them as the last error. Write errors are returned to the caller of
//! [`LogCommand::submit`](crate::LogCommand::submit).

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Core error type for huckle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed backend documents
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Feeding submission errors
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reaching or staying subscribed to the backend.
///
/// Each variant maps onto a supervisor transition:
/// `Auth` and `Transport` during an attempt send it back to `Disconnected`,
/// `Transport` and `Timeout` while connected trigger `Reconnecting`,
/// `ClockDiscontinuity` triggers `Suspended`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConnectionError {
    /// Bad credentials. Retried only after backoff or on manual refresh.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Dropped connection, DNS failure, listener callback error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Nothing heard from the backend within the allowed interval.
    #[error("No event or keepalive for {silent_secs}s")]
    Timeout { silent_secs: u64 },

    /// Wall clock ran far ahead of the monotonic clock: the host was asleep.
    #[error("Clock discontinuity: wall clock advanced {wall_secs}s, monotonic clock {monotonic_secs}s")]
    ClockDiscontinuity { wall_secs: i64, monotonic_secs: u64 },
}

/// Errors returned from submitting a feeding to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// No authenticated session is available.
    #[error("Not connected to the backend")]
    NotConnected,

    /// The backend refused the entry.
    #[error("Backend rejected the feeding: {0}")]
    Rejected(String),

    /// The write did not reach the backend.
    #[error("Transport error while writing: {0}")]
    Transport(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Credentials absent from both environment and config file
    #[error("Missing credentials: set HUCKLEBERRY_EMAIL and HUCKLEBERRY_PASSWORD")]
    MissingCredentials,

    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory: {0}")]
    DataDir(String),
}

/// Errors decoding a feeding document pushed by the backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// A field exists but has the wrong type
    #[error("Field '{field}' has an unexpected type")]
    WrongType { field: &'static str },

    /// Timestamp cannot be represented
    #[error("Timestamp {0} is out of range")]
    TimestampOutOfRange(f64),

    /// Unit string not understood
    #[error("Unknown volume unit '{0}'")]
    UnknownUnit(String),

    /// Amount is negative or not a number
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
