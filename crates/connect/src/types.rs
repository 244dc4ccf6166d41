//! Request and response types of the challenge REST API.

use deckmatch_core::errors::RemoteError;
use deckmatch_core::feed::CandidateItem;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Candidates
// ─────────────────────────────────────────────────────────────────────────────

/// Candidate list, either bare or wrapped in an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CandidatesResponse {
    List(Vec<CandidateItem>),
    Wrapped {
        #[serde(default)]
        candidates: Vec<CandidateItem>,
    },
}

impl CandidatesResponse {
    pub fn into_items(self) -> Vec<CandidateItem> {
        match self {
            Self::List(items) | Self::Wrapped { candidates: items } => items,
        }
    }
}

/// Response of the image resolution endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveImageResponse {
    #[serde(default)]
    pub url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Join
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `POST /api/v1/challenges/{id}/join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub user_id: String,
    pub display_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error body returned by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiErrorResponse {
    pub fn into_remote(self, status: u16, body: Option<serde_json::Value>) -> RemoteError {
        RemoteError {
            status: Some(status),
            code: self.code,
            message: self.message.or(self.error),
            details: self.details,
            hint: self.hint,
            body,
        }
    }
}
