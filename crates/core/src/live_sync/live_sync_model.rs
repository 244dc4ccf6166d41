use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::session::UserProfile;

/// Typed event delivered by a profile subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The backend holds a new version of the user's profile.
    ProfileChanged(UserProfile),
    /// The channel dropped. Tolerated; the subscription may recover by itself.
    Disconnected { reason: String },
}

/// What the reconciler did with one push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event belonged to another user or to an ended session.
    Ignored,
    Applied { reload_scheduled: bool },
    Disconnected,
}

/// Marks the primary feed as due for a reload.
///
/// Set by the reconciler when the winstreak changes and consumed on the next
/// natural reload, never mid-swipe. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct ReloadFlag(Arc<AtomicBool>);

impl ReloadFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a reload as due. Returns true if it was not already due.
    pub fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_due(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consume the flag, returning whether a reload was due.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
