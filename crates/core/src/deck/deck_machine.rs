//! Deck state machine.
//!
//! Pure state: inputs are drag offsets, releases and discrete commits; outputs
//! are [`Transition`] values carrying the effects the host must perform. The
//! machine never awaits anything. A right commit parks the deck in
//! [`DeckPhase::AwaitingJoin`] until [`DeckStateMachine::finish_right`] is
//! called, which is what keeps commits serial.
//!
//! Invariants:
//! - `0 <= pointer <= len`
//! - an item id appears in the skip stack at most once
//! - the pointer only moves backwards through undo, to the position of the
//!   undone item in the loaded sequence

use log::debug;

use super::{CommitRejected, DeckEffect, DeckPhase, Transition, TransitionKind};
use crate::feed::{CandidateItem, FeedMode};

type CommitResult = std::result::Result<Transition, CommitRejected>;

#[derive(Debug, Clone)]
pub struct DeckStateMachine {
    items: Vec<CandidateItem>,
    pointer: usize,
    skip_stack: Vec<CandidateItem>,
    phase: DeckPhase,
    mode: FeedMode,
    exhausted_emitted: bool,
    commit_threshold: f64,
}

impl DeckStateMachine {
    /// Empty deck. `commit_threshold` is the release displacement that
    /// commits, in the same units as drag offsets.
    pub fn new(commit_threshold: f64) -> Self {
        Self {
            items: Vec::new(),
            pointer: 0,
            skip_stack: Vec::new(),
            phase: DeckPhase::Idle,
            mode: FeedMode::Primary,
            exhausted_emitted: false,
            commit_threshold,
        }
    }

    /// Replace the sequence. Resets pointer, skip stack and the exhaustion
    /// signal. An empty sequence is exhausted immediately.
    pub fn load(&mut self, items: Vec<CandidateItem>, mode: FeedMode) -> Vec<DeckEffect> {
        debug!("Deck load: {} item(s), mode {}", items.len(), mode);
        self.items = items;
        self.pointer = 0;
        self.skip_stack.clear();
        self.phase = DeckPhase::Idle;
        self.mode = mode;
        self.exhausted_emitted = false;

        let mut effects = Vec::new();
        self.check_exhausted(&mut effects);
        effects
    }

    pub fn set_commit_threshold(&mut self, commit_threshold: f64) {
        self.commit_threshold = commit_threshold;
    }

    pub fn current(&self) -> Option<&CandidateItem> {
        self.items.get(self.pointer)
    }

    pub fn items(&self) -> &[CandidateItem] {
        &self.items
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.items.len() - self.pointer
    }

    pub fn skip_stack(&self) -> &[CandidateItem] {
        &self.skip_stack
    }

    pub fn can_undo(&self) -> bool {
        !self.skip_stack.is_empty() && !self.is_busy()
    }

    pub fn phase(&self) -> &DeckPhase {
        &self.phase
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn is_exhausted(&self) -> bool {
        self.pointer >= self.items.len()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, DeckPhase::AwaitingJoin { .. })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Gesture input
    // ─────────────────────────────────────────────────────────────────────

    /// Update the live drag offset. Starts a drag from idle. Ignored while a
    /// right commit is resolving. No structural change.
    pub fn drag(&mut self, dx: f64, dy: f64) -> bool {
        match self.phase {
            DeckPhase::AwaitingJoin { .. } => false,
            DeckPhase::Idle | DeckPhase::Dragging { .. } => {
                self.phase = DeckPhase::Dragging { dx, dy };
                true
            }
        }
    }

    /// Interpret a release at displacement (`dx`, `dy`).
    ///
    /// Right past the threshold commits right, left past it skips, down past
    /// it (with horizontal travel inside the threshold) undoes if there is
    /// something to undo. Anything else reverts. A commit that cannot apply,
    /// such as a swipe on an exhausted deck, also reverts.
    pub fn release(&mut self, dx: f64, dy: f64) -> CommitResult {
        if self.is_busy() {
            return Err(CommitRejected::Busy);
        }
        let threshold = self.commit_threshold;

        let attempt = if dx > threshold {
            Some(self.commit_right())
        } else if dx < -threshold {
            Some(self.commit_left())
        } else if dy > threshold && !self.skip_stack.is_empty() {
            Some(self.commit_back())
        } else {
            None
        };

        match attempt {
            Some(Ok(transition)) => Ok(transition),
            Some(Err(CommitRejected::UndoTargetMissing(id))) => {
                self.phase = DeckPhase::Idle;
                Err(CommitRejected::UndoTargetMissing(id))
            }
            Some(Err(_)) | None => {
                debug!("Deck release ({:.1}, {:.1}) reverted", dx, dy);
                self.phase = DeckPhase::Idle;
                Ok(Transition::reverted())
            }
        }
    }

    /// Abandon a drag without interpreting it.
    pub fn cancel_drag(&mut self) {
        if matches!(self.phase, DeckPhase::Dragging { .. }) {
            self.phase = DeckPhase::Idle;
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commits (shared by gestures and discrete input)
    // ─────────────────────────────────────────────────────────────────────

    /// Skip the current card.
    pub fn commit_left(&mut self) -> CommitResult {
        if self.is_busy() {
            return Err(CommitRejected::Busy);
        }
        let item = self.current().cloned().ok_or(CommitRejected::NoCurrentItem)?;

        self.skip_stack.retain(|skipped| skipped.id != item.id);
        self.skip_stack.push(item.clone());
        let mut effects = vec![DeckEffect::Skipped(item)];

        self.pointer += 1;
        self.phase = DeckPhase::Idle;
        self.check_exhausted(&mut effects);

        Ok(Transition::new(TransitionKind::CommittedLeft, effects))
    }

    /// Hand the current card to the join gate. The pointer stays put until
    /// [`finish_right`](Self::finish_right).
    pub fn commit_right(&mut self) -> CommitResult {
        if self.is_busy() {
            return Err(CommitRejected::Busy);
        }
        let item = self.current().cloned().ok_or(CommitRejected::NoCurrentItem)?;

        debug!("Deck right commit on '{}'", item.id);
        self.phase = DeckPhase::AwaitingJoin {
            item_id: item.id.clone(),
        };

        Ok(Transition::new(
            TransitionKind::CommittedRight,
            vec![DeckEffect::RightCommitted(item)],
        ))
    }

    /// Close the pending right commit. `advance` is true when the join
    /// succeeded; otherwise the card stays current so the user can retry or
    /// skip it.
    pub fn finish_right(
        &mut self,
        advance: bool,
    ) -> std::result::Result<Vec<DeckEffect>, CommitRejected> {
        if !self.is_busy() {
            return Err(CommitRejected::NotAwaitingJoin);
        }
        self.phase = DeckPhase::Idle;

        let mut effects = Vec::new();
        if advance && self.pointer < self.items.len() {
            self.pointer += 1;
            self.check_exhausted(&mut effects);
        }
        Ok(effects)
    }

    /// Bring back the most recently skipped card.
    pub fn commit_back(&mut self) -> CommitResult {
        if self.is_busy() {
            return Err(CommitRejected::Busy);
        }
        let item = self.skip_stack.pop().ok_or(CommitRejected::NothingToUndo)?;

        let Some(position) = self.items.iter().position(|c| c.id == item.id) else {
            debug!("Undo target '{}' is not in the loaded deck, dropping it", item.id);
            return Err(CommitRejected::UndoTargetMissing(item.id));
        };

        self.pointer = position;
        self.phase = DeckPhase::Idle;

        Ok(Transition::new(
            TransitionKind::CommittedBack,
            vec![DeckEffect::Restored(item)],
        ))
    }

    fn check_exhausted(&mut self, effects: &mut Vec<DeckEffect>) {
        if self.pointer >= self.items.len() && !self.exhausted_emitted {
            self.exhausted_emitted = true;
            effects.push(DeckEffect::Exhausted);
        }
    }
}
