use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Format of a challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    OneToOne,
    Team,
}

/// Which query produced the current deck.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Filtered by the user's eligibility bucket. Cached.
    #[default]
    Primary,
    /// Locality and eligibility filters relaxed. Never cached.
    Expanded,
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Expanded => write!(f, "expanded"),
        }
    }
}

/// The user hosting a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostIdentity {
    pub user_id: String,
    pub display_name: String,
}

/// A challenge posting shown as one card. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    pub id: String,
    pub title: String,
    pub host: HostIdentity,
    pub location: String,
    pub starts_at: DateTime<Utc>,
    pub rules: String,
    pub description: String,
    /// How the winner is determined.
    pub win_condition: String,
    pub ticket_price: Decimal,
    pub challenge_type: ChallengeType,
    /// Raw storage reference of the host image, as returned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_image_ref: Option<String>,
    /// Resolved display URL, set during feed enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_image: Option<String>,
}

/// Result of a feed load.
#[derive(Clone, Debug, PartialEq)]
pub struct Feed {
    pub mode: FeedMode,
    pub items: Vec<CandidateItem>,
    /// True if the items came from the cache rather than a fetch.
    pub from_cache: bool,
}
