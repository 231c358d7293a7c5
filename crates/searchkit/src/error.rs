//! Error types for SearchKit

use thiserror::Error;

/// Errors that can occur during search and fetch operations
#[derive(Debug, Error)]
pub enum SearchKitError {
    /// Input rejected before any network I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection failure, timeout or transport error
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Search backend or fetch target answered with a non-success status
    #[error("Request rejected with HTTP status {status}")]
    BackendRejected { status: u16 },

    /// Response body could not be interpreted
    #[error("Failed to parse response: {0}")]
    ParseFailure(String),

    /// Caller cancelled the operation before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

/// Fieldless tag for each [`SearchKitError`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NetworkFailure,
    BackendRejected,
    ParseFailure,
    Cancelled,
    ClientBuild,
}

impl SearchKitError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchKitError::NetworkFailure("request timed out".to_string())
        } else if err.is_connect() {
            SearchKitError::NetworkFailure(format!("failed to connect: {}", err))
        } else if let Some(status) = err.status() {
            SearchKitError::BackendRejected {
                status: status.as_u16(),
            }
        } else {
            SearchKitError::NetworkFailure(err.to_string())
        }
    }

    /// Tag of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchKitError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SearchKitError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            SearchKitError::BackendRejected { .. } => ErrorKind::BackendRejected,
            SearchKitError::ParseFailure(_) => ErrorKind::ParseFailure,
            SearchKitError::Cancelled => ErrorKind::Cancelled,
            SearchKitError::ClientBuild(_) => ErrorKind::ClientBuild,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SearchKitError::InvalidArgument(msg.into())
    }
}
