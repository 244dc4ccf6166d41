//! Session event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::{CandidateItem, FeedMode};
use crate::join::MatchResult;

/// Category of a user-visible alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LoadFailure,
    EligibilityBlocked,
    AlreadyActiveElsewhere,
    SlotTaken,
    JoinFailure,
}

/// Events emitted by the session engine for the presentation layer.
///
/// These are facts about state that already changed. The presentation layer
/// visualizes them and never feeds them back as input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwipeEvent {
    /// A feed finished loading and replaced the deck.
    FeedLoaded { mode: FeedMode, count: usize },

    /// A card was skipped (left commit).
    CardSkipped { item: CandidateItem },

    /// A previously skipped card is current again (undo).
    CardRestored { item: CandidateItem },

    /// Right commit accepted; the join gate now owns the card.
    RightCommitted { item: CandidateItem },

    /// The pointer reached the end of the deck. Fired once per load.
    DeckExhausted { mode: FeedMode },

    /// No session exists; the host should route to sign-in.
    SignInRequired,

    Alert { kind: AlertKind, message: String },

    /// The join interstitial is up and cannot be dismissed yet.
    InterstitialShown {
        item: CandidateItem,
        dismissible_at: DateTime<Utc>,
    },

    /// Minimum dwell elapsed; the interstitial may now be dismissed.
    InterstitialDismissible { item_id: String },

    /// The interstitial closed without a join (error, cancel).
    InterstitialClosed { item_id: String },

    MatchFound { result: MatchResult },

    /// A profile push changed eligibility; the next reload will refetch.
    FeedReloadScheduled,
}

impl SwipeEvent {
    pub fn alert(kind: AlertKind, message: impl Into<String>) -> Self {
        Self::Alert {
            kind,
            message: message.into(),
        }
    }

    pub fn feed_loaded(mode: FeedMode, count: usize) -> Self {
        Self::FeedLoaded { mode, count }
    }
}
