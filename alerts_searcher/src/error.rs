//! Error types for alerts_searcher

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration key is missing or holds an unusable value
    #[error("Invalid configuration for '{key}': {message}")]
    Config { key: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file exists but does not hold a usable marker
    #[error("Invalid state file {path}: {message}")]
    State { path: String, message: String },

    /// Transport-level failure talking to the search index
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Search index answered with a non-success status
    #[error("Search request failed with {status}: {body}")]
    SearchStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Kafka producer error
    #[error("Kafka error: {0}")]
    Kafka(#[from] kafka::Error),

    /// The run did not finish within its deadline
    #[error("Run exceeded deadline of {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Create a configuration error
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a state file error
    pub fn state(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::State {
            path: path.into(),
            message: message.into(),
        }
    }
}
