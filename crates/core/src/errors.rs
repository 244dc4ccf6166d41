//! Core error types for the Deckmatch session engine.
//!
//! This module defines transport-agnostic error types. Adapter crates (HTTP,
//! push channels) convert their own errors into [`RemoteError`] so the engine
//! can derive user-facing messages without knowing the wire format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deck::CommitRejected;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fallback shown when a failure carries nothing a user could read.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Root error type for the session engine.
///
/// No variant is fatal: every caller returns the session to a stable idle deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Feed could not be fetched (network or backend unavailable). Retryable.
    #[error("Failed to load challenges: {0}")]
    Load(String),

    /// Business-rule refusal from the eligibility check.
    #[error("Not eligible to join: {0}")]
    EligibilityBlocked(String),

    #[error("Join conflict: {0}")]
    JoinConflict(JoinConflict),

    /// Unclassified join failure, already converted to a human message.
    #[error("Join failed: {0}")]
    JoinFailed(String),

    /// Push channel issue. Never surfaced to the user.
    #[error("Profile subscription failed: {0}")]
    Subscription(String),

    #[error("No active session")]
    NoSession,

    /// The deck refused an input (busy, nothing to commit, nothing to undo).
    #[error("Input rejected: {0}")]
    Rejected(#[from] CommitRejected),

    /// A reload or exploration was requested while a join is unresolved.
    #[error("A join is still being resolved")]
    JoinInProgress,

    /// A response arrived for a session identity that is no longer current.
    #[error("Discarded response for stale session of user {0}")]
    StaleSession(String),

    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

}

/// Conflicts reported by the backend when a join is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinConflict {
    /// The user already holds an active challenge elsewhere.
    #[error("already holds an active challenge")]
    AlreadyActiveElsewhere,
    /// Another user joined the slot first.
    #[error("slot already taken")]
    SlotTaken,
}

/// Structured error returned by a remote collaborator.
///
/// All fields are optional; adapters fill whatever the transport exposed.
#[derive(Error, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Raw response body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl RemoteError {
    /// Create an error carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create an error from an HTTP status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Best human-readable message available.
    ///
    /// Order: `message`, `details`, `hint`, the serialized error, then the
    /// fixed generic string.
    pub fn human_message(&self) -> String {
        let structured = [&self.message, &self.details, &self.hint]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty());
        if let Some(text) = structured {
            return text.to_string();
        }

        if self.status.is_some() || self.code.is_some() || self.body.is_some() {
            if let Ok(serialized) = serde_json::to_string(self) {
                return serialized;
            }
        }

        GENERIC_FAILURE_MESSAGE.to_string()
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.status, &self.code) {
            (Some(status), Some(code)) => {
                write!(f, "{} ({}): {}", code, status, self.human_message())
            }
            (Some(status), None) => write!(f, "({}) {}", status, self.human_message()),
            (None, Some(code)) => write!(f, "{}: {}", code, self.human_message()),
            (None, None) => write!(f, "{}", self.human_message()),
        }
    }
}

impl Error {
    /// Message suitable for an alert.
    pub fn user_message(&self) -> String {
        match self {
            Error::Remote(remote) => remote.human_message(),
            Error::Load(reason) | Error::EligibilityBlocked(reason) | Error::JoinFailed(reason) => {
                reason.clone()
            }
            Error::JoinConflict(JoinConflict::AlreadyActiveElsewhere) => {
                crate::join::ALREADY_ACTIVE_MESSAGE.to_string()
            }
            Error::JoinConflict(JoinConflict::SlotTaken) => {
                crate::join::SLOT_TAKEN_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}
