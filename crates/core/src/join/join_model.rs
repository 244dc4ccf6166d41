use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::JoinConflict;
use crate::feed::CandidateItem;

/// Answer of the advisory eligibility check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EligibilityDecision {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Backend answer to a join request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    /// The challenge the user is already committed to, when that is why the
    /// join was refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_active_item: Option<CandidateItem>,
}

/// A right commit that passed the eligibility check and awaits dismissal of
/// the interstitial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJoin {
    pub attempt_id: Uuid,
    pub item: CandidateItem,
    pub user_id: String,
    pub display_name: String,
    pub opened_at: DateTime<Utc>,
    pub dismissible_at: DateTime<Utc>,
}

/// Successful join handed to the match presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub item: CandidateItem,
    pub message: String,
    pub joined_at: DateTime<Utc>,
}

/// Result of handing a right commit to the gate.
#[derive(Clone, Debug, PartialEq)]
pub enum GateOutcome {
    /// Eligible; the interstitial is up.
    Opened(PendingJoin),
    /// The eligibility check refused or failed. Nothing was created.
    Blocked { reason: String },
    /// No session; the host routes to sign-in.
    SignInRequired,
    /// Another right commit is already being handled.
    Busy,
    /// The gate was cancelled while the eligibility check ran.
    Cancelled,
}

/// Result of the remote join.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinOutcome {
    Joined(MatchResult),
    Conflict {
        conflict: JoinConflict,
        message: String,
    },
    Failed { message: String },
}

impl JoinOutcome {
    pub fn is_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }
}

/// Result of a dismissal request.
#[derive(Clone, Debug, PartialEq)]
pub enum DismissOutcome {
    /// No pending join, or a join is already in flight.
    Ignored,
    /// The minimum dwell has not elapsed.
    NotYetDismissible,
    /// A remote join ran to completion.
    Completed(JoinOutcome),
}
