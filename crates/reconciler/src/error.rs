//! Error types for the reconciler crate.

use quay_client::ApiResponse;
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Longest response snippet kept in an [`Error::UnexpectedStatus`].
const BODY_SNIPPET_CHARS: usize = 256;

/// Reconciler error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The registry could not be reached or its answer could not be decoded.
    #[error("registry client error: {0}")]
    Client(#[from] quay_client::Error),

    /// The registry answered an operation with a non-success status.
    #[error("{operation} returned status {status}: {body}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A role file could not be loaded.
    #[error("invalid role: {reason}")]
    InvalidRole { reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unexpected status error from a registry response.
    pub fn unexpected_status<T>(operation: impl Into<String>, response: &ApiResponse<T>) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            status: response.status(),
            body: response.raw_body().chars().take(BODY_SNIPPET_CHARS).collect(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid role error.
    pub fn invalid_role(reason: impl Into<String>) -> Self {
        Self::InvalidRole {
            reason: reason.into(),
        }
    }

    /// HTTP status of a logical failure, if this is one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Take the body of a successful response, or fail with the operation name.
pub(crate) fn require_success<T>(operation: &str, response: ApiResponse<T>) -> Result<T> {
    let failure = Error::unexpected_status(operation, &response);
    if response.is_success() {
        response.into_body().ok_or(failure)
    } else {
        Err(failure)
    }
}
