//! Error types for the connect crate.

use deckmatch_core::errors::RemoteError;
use thiserror::Error;

/// Result type alias for challenge API operations.
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Errors that can occur talking to the challenge backend.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the backend
    #[error("API error ({status}): {}", .error.human_message())]
    Api { status: u16, error: RemoteError },

    /// Authentication error (missing or invalid token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ConnectError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            error: RemoteError::api(status, message),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Structured form handed to the engine.
    pub fn into_remote(self) -> RemoteError {
        match self {
            Self::Api { error, .. } => error,
            Self::Http(e) => RemoteError {
                status: e.status().map(|s| s.as_u16()),
                message: Some(e.to_string()),
                ..Default::default()
            },
            other => RemoteError::message(other.to_string()),
        }
    }
}

impl From<ConnectError> for deckmatch_core::Error {
    fn from(error: ConnectError) -> Self {
        deckmatch_core::Error::Remote(error.into_remote())
    }
}
