use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feed::CandidateItem;

/// What the deck is doing between inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum DeckPhase {
    Idle,
    /// A card is being dragged; the offset is presentation-only state.
    Dragging { dx: f64, dy: f64 },
    /// A right commit is being resolved by the join gate. No input is
    /// accepted until it finishes.
    AwaitingJoin { item_id: String },
}

/// Decision taken for one commit or release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    CommittedLeft,
    CommittedRight,
    CommittedBack,
    /// Released below every threshold; the card returns to rest.
    Reverted,
}

/// Side effect the host must carry out after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum DeckEffect {
    Skipped(CandidateItem),
    /// Hand the item to the join gate. The pointer has not moved yet.
    RightCommitted(CandidateItem),
    Restored(CandidateItem),
    /// The pointer reached the end. Emitted once per load.
    Exhausted,
}

/// Output of a state machine step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub effects: Vec<DeckEffect>,
}

impl Transition {
    pub(crate) fn new(kind: TransitionKind, effects: Vec<DeckEffect>) -> Self {
        Self { kind, effects }
    }

    pub(crate) fn reverted() -> Self {
        Self::new(TransitionKind::Reverted, Vec::new())
    }

    pub fn is_exhausted(&self) -> bool {
        self.effects.contains(&DeckEffect::Exhausted)
    }

    /// Item handed to the join gate, if this was a right commit.
    pub fn right_committed(&self) -> Option<&CandidateItem> {
        self.effects.iter().find_map(|effect| match effect {
            DeckEffect::RightCommitted(item) => Some(item),
            _ => None,
        })
    }
}

/// Why the deck refused an input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitRejected {
    #[error("a right commit is still being resolved")]
    Busy,

    #[error("no card left to commit")]
    NoCurrentItem,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("no right commit is awaiting resolution")]
    NotAwaitingJoin,

    /// The undone item is not part of the loaded sequence.
    #[error("undo target '{0}' is not in the current deck")]
    UndoTargetMissing(String),
}
