//! Error types for search backend calls.

use thiserror::Error;

/// Errors surfaced by a [`SearchBackend`](crate::SearchBackend).
#[derive(Debug, Error)]
pub enum SearchError {
    /// The backend could not be reached at the network level.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend answered with a failure status.
    #[error("backend returned HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The request failed somewhere between us and the backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// No document with this identifier exists.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The configured endpoint cannot be turned into request URLs.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

impl SearchError {
    /// Network-level failures, logged at a lower severity than the rest
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                reason: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, SearchError>;
