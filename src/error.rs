// src/error.rs

//! Unified error handling for the frontier poller.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for poller operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The status store could not be reached
    #[error("Connection error for {target}: {message}")]
    Connection { target: String, message: String },

    /// The status store rejected or failed a request
    #[error("Store error: {0}")]
    Store(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a connection error with the target that failed.
    pub fn connection(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }
}

/// Failure of a single poll against the status store.
///
/// Recoverable: the scheduling tick logs it and retries on the next call.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("status query failed after {elapsed:?}: {source}")]
    Query {
        elapsed: Duration,
        #[source]
        source: AppError,
    },
}

impl PollError {
    /// Time spent before the store reported the failure.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Query { elapsed, .. } => *elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_names_target() {
        let err = AppError::connection("data/status.json", "file not found");
        assert_eq!(
            err.to_string(),
            "Connection error for data/status.json: file not found"
        );
    }

    #[test]
    fn poll_error_keeps_source() {
        let err = PollError::Query {
            elapsed: Duration::from_millis(12),
            source: AppError::store("timeout"),
        };
        assert_eq!(err.elapsed(), Duration::from_millis(12));
        assert!(err.to_string().contains("Store error: timeout"));
    }
}
