//! Error types for the quay-client crate.

use thiserror::Error;

/// Result type for registry client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the registry.
///
/// Only transport, encoding and configuration failures live here. A request
/// that completes with a non-success status is not an error at this layer;
/// it comes back as an [`ApiResponse`](crate::ApiResponse) for the caller to
/// inspect.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A request path could not be joined onto the base URL.
    #[error("invalid request path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error.
    pub fn config_error(reason: impl Into<String>) -> Self {
        Self::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
