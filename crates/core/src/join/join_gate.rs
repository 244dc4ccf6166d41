//! Join gate.
//!
//! Owns the single [`PendingJoin`] slot and the in-flight guard of a session.
//! The gate moves through `Idle -> Checking -> Pending -> Joining -> Idle`;
//! every state other than `Idle` rejects a new right commit, and only
//! `Pending` past its dwell accepts a dismissal. The remote join therefore
//! runs at most once per pending join no matter how often dismissal fires.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use log::{debug, info, warn};
use uuid::Uuid;

use super::{
    DismissOutcome, GateOutcome, JoinBackend, JoinOutcome, JoinResponse, MatchResult, PendingJoin,
    ALREADY_ACTIVE_MESSAGE, DEFAULT_BLOCKED_MESSAGE, SLOT_TAKEN_MESSAGE,
};
use crate::clock::Clock;
use crate::errors::{Error, JoinConflict, RemoteError};
use crate::events::{AlertKind, SwipeEvent, SwipeEventSink};
use crate::feed::CandidateItem;
use crate::session::SessionContext;

#[derive(Debug, Clone, PartialEq)]
enum GateState {
    Idle,
    Checking { attempt_id: Uuid },
    Pending(PendingJoin),
    Joining(PendingJoin),
}

/// Puts the gate back to `Idle` when dropped, unless the state has moved on
/// to a different attempt. Covers early returns and dropped futures.
struct ResetOnDrop<'a> {
    state: &'a Mutex<GateState>,
    attempt_id: Uuid,
    armed: bool,
}

impl ResetOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = lock_state(self.state);
        let owned = match &*state {
            GateState::Checking { attempt_id } => *attempt_id == self.attempt_id,
            GateState::Pending(p) | GateState::Joining(p) => p.attempt_id == self.attempt_id,
            GateState::Idle => false,
        };
        if owned {
            *state = GateState::Idle;
        }
    }
}

fn lock_state(state: &Mutex<GateState>) -> MutexGuard<'_, GateState> {
    state.lock().unwrap_or_else(|poisoned| {
        warn!("Join gate mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

pub struct JoinGate {
    backend: Arc<dyn JoinBackend>,
    session: SessionContext,
    sink: Arc<dyn SwipeEventSink>,
    clock: Arc<dyn Clock>,
    dwell: Duration,
    state: Mutex<GateState>,
}

impl JoinGate {
    pub fn new(
        backend: Arc<dyn JoinBackend>,
        session: SessionContext,
        sink: Arc<dyn SwipeEventSink>,
        clock: Arc<dyn Clock>,
        dwell: Duration,
    ) -> Self {
        Self {
            backend,
            session,
            sink,
            clock,
            dwell,
            state: Mutex::new(GateState::Idle),
        }
    }

    /// The pending join, including one whose remote call is in flight.
    pub fn pending_join(&self) -> Option<PendingJoin> {
        match &*lock_state(&self.state) {
            GateState::Pending(p) | GateState::Joining(p) => Some(p.clone()),
            GateState::Idle | GateState::Checking { .. } => None,
        }
    }

    pub fn is_join_in_flight(&self) -> bool {
        matches!(*lock_state(&self.state), GateState::Joining(_))
    }

    pub fn is_idle(&self) -> bool {
        matches!(*lock_state(&self.state), GateState::Idle)
    }

    /// True once the pending interstitial has been up for the minimum dwell.
    pub fn is_dismissible(&self) -> bool {
        match &*lock_state(&self.state) {
            GateState::Pending(p) => self.clock.now() >= p.dismissible_at,
            _ => false,
        }
    }

    /// Handle a right commit on `item`.
    pub async fn on_right_commit(&self, item: CandidateItem) -> GateOutcome {
        let Some(session) = self.session.get() else {
            info!("Right commit on '{}' without a session, redirecting to sign-in", item.id);
            self.sink.emit(SwipeEvent::SignInRequired);
            return GateOutcome::SignInRequired;
        };

        let attempt_id = Uuid::new_v4();
        {
            let mut state = lock_state(&self.state);
            if *state != GateState::Idle {
                debug!("Right commit on '{}' rejected: gate busy", item.id);
                return GateOutcome::Busy;
            }
            *state = GateState::Checking { attempt_id };
        }
        let reset = ResetOnDrop {
            state: &self.state,
            attempt_id,
            armed: true,
        };

        let decision = self.backend.can_join(&session.user_id).await;

        let mut state = lock_state(&self.state);
        if *state != (GateState::Checking { attempt_id }) {
            debug!("Eligibility check for '{}' finished after cancel", item.id);
            drop(state);
            reset.disarm();
            return GateOutcome::Cancelled;
        }

        let reason = match decision {
            Ok(decision) if decision.allowed => None,
            Ok(decision) => Some(
                decision
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BLOCKED_MESSAGE.to_string()),
            ),
            Err(e) => {
                warn!("Eligibility check failed for '{}': {}", session.user_id, e);
                Some(e.user_message())
            }
        };

        if let Some(reason) = reason {
            *state = GateState::Idle;
            drop(state);
            reset.disarm();
            info!("Join on '{}' blocked: {}", item.id, reason);
            self.sink.emit(SwipeEvent::alert(
                AlertKind::EligibilityBlocked,
                reason.clone(),
            ));
            return GateOutcome::Blocked { reason };
        }

        let opened_at = self.clock.now();
        let pending = PendingJoin {
            attempt_id,
            display_name: session.join_name().to_string(),
            user_id: session.user_id.clone(),
            item,
            opened_at,
            dismissible_at: opened_at + self.dwell,
        };
        *state = GateState::Pending(pending.clone());
        drop(state);
        reset.disarm();

        info!(
            "Join attempt {} opened for '{}'",
            pending.attempt_id, pending.item.id
        );
        self.sink.emit(SwipeEvent::InterstitialShown {
            item: pending.item.clone(),
            dismissible_at: pending.dismissible_at,
        });
        GateOutcome::Opened(pending)
    }

    /// Sleep out the remaining dwell, then announce the interstitial as
    /// dismissible. Returns false if the pending join went away meanwhile.
    pub async fn wait_until_dismissible(&self) -> bool {
        let Some((attempt_id, remaining)) = (match &*lock_state(&self.state) {
            GateState::Pending(p) => Some((p.attempt_id, p.dismissible_at - self.clock.now())),
            _ => None,
        }) else {
            return false;
        };

        if let Ok(remaining) = remaining.to_std() {
            tokio::time::sleep(remaining).await;
        }

        let item_id = match &*lock_state(&self.state) {
            GateState::Pending(p) if p.attempt_id == attempt_id => p.item.id.clone(),
            _ => return false,
        };
        self.sink.emit(SwipeEvent::InterstitialDismissible { item_id });
        true
    }

    /// Dismiss the interstitial and run the remote join.
    ///
    /// Ignored without a pending join or while a join is in flight, so rapid
    /// repeated dismissal submits once. The gate is back to idle whenever
    /// this returns `Completed`.
    pub async fn dismiss(&self) -> DismissOutcome {
        let pending = {
            let mut state = lock_state(&self.state);
            let pending = match &*state {
                GateState::Pending(p) if self.clock.now() >= p.dismissible_at => p.clone(),
                GateState::Pending(_) => return DismissOutcome::NotYetDismissible,
                GateState::Joining(_) => {
                    debug!("Dismiss ignored: join already in flight");
                    return DismissOutcome::Ignored;
                }
                GateState::Idle | GateState::Checking { .. } => {
                    debug!("Dismiss ignored: no pending join");
                    return DismissOutcome::Ignored;
                }
            };
            *state = GateState::Joining(pending.clone());
            pending
        };
        let reset = ResetOnDrop {
            state: &self.state,
            attempt_id: pending.attempt_id,
            armed: true,
        };

        info!(
            "Join attempt {}: joining '{}' as '{}'",
            pending.attempt_id, pending.item.id, pending.user_id
        );
        let response = self
            .backend
            .join(&pending.item.id, &pending.user_id, &pending.display_name)
            .await;
        let outcome = self.interpret(&pending, response);

        // Clear the slot and the guard before anyone hears about the result.
        drop(reset);

        match &outcome {
            JoinOutcome::Joined(result) => {
                info!("Join attempt {} succeeded", pending.attempt_id);
                self.sink.emit(SwipeEvent::MatchFound {
                    result: result.clone(),
                });
            }
            JoinOutcome::Conflict { conflict, message } => {
                info!("Join attempt {} conflicted: {}", pending.attempt_id, conflict);
                let kind = match conflict {
                    JoinConflict::AlreadyActiveElsewhere => AlertKind::AlreadyActiveElsewhere,
                    JoinConflict::SlotTaken => AlertKind::SlotTaken,
                };
                self.close_with_alert(&pending, kind, message);
            }
            JoinOutcome::Failed { message } => {
                warn!("Join attempt {} failed: {}", pending.attempt_id, message);
                self.close_with_alert(&pending, AlertKind::JoinFailure, message);
            }
        }

        DismissOutcome::Completed(outcome)
    }

    /// Drop a pending join that is not yet in flight.
    pub fn cancel(&self) -> bool {
        let mut state = lock_state(&self.state);
        let closed_item = match &*state {
            GateState::Pending(p) => Some(p.item.id.clone()),
            GateState::Checking { .. } => None,
            GateState::Joining(_) | GateState::Idle => return false,
        };
        *state = GateState::Idle;
        drop(state);

        if let Some(item_id) = closed_item {
            debug!("Pending join on '{}' cancelled", item_id);
            self.sink.emit(SwipeEvent::InterstitialClosed { item_id });
        }
        true
    }

    fn close_with_alert(&self, pending: &PendingJoin, kind: AlertKind, message: &str) {
        self.sink.emit_batch(vec![
            SwipeEvent::InterstitialClosed {
                item_id: pending.item.id.clone(),
            },
            SwipeEvent::alert(kind, message),
        ]);
    }

    fn interpret(
        &self,
        pending: &PendingJoin,
        response: crate::errors::Result<JoinResponse>,
    ) -> JoinOutcome {
        match response {
            Ok(response) if response.success => JoinOutcome::Joined(MatchResult {
                item: pending.item.clone(),
                message: response.message,
                joined_at: self.clock.now(),
            }),
            Ok(response) => match classify_response(&response) {
                Some(conflict) => JoinOutcome::Conflict {
                    message: conflict_message(conflict, response.conflicting_active_item.as_ref()),
                    conflict,
                },
                None => JoinOutcome::Failed {
                    message: refusal_error(&response).human_message(),
                },
            },
            Err(e) => match classify_error(&e) {
                Some(conflict) => JoinOutcome::Conflict {
                    message: conflict_message(conflict, None),
                    conflict,
                },
                None => JoinOutcome::Failed {
                    message: e.user_message(),
                },
            },
        }
    }
}

/// A refused join as a structured error, so it shares the message fallbacks
/// of transport failures.
fn refusal_error(response: &JoinResponse) -> RemoteError {
    RemoteError {
        message: non_empty(&response.message).map(str::to_string),
        body: serde_json::to_value(response).ok(),
        ..Default::default()
    }
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn classify_text(text: &str) -> Option<JoinConflict> {
    let text = text.to_lowercase();
    if text.contains("active challenge") || text.contains("already active") {
        Some(JoinConflict::AlreadyActiveElsewhere)
    } else if text.contains("already taken")
        || text.contains("slot taken")
        || text.contains("been taken")
        || text.contains("already joined by")
    {
        Some(JoinConflict::SlotTaken)
    } else {
        None
    }
}

fn classify_response(response: &JoinResponse) -> Option<JoinConflict> {
    if response.conflicting_active_item.is_some() {
        return Some(JoinConflict::AlreadyActiveElsewhere);
    }
    classify_text(&response.message)
}

fn classify_error(error: &Error) -> Option<JoinConflict> {
    match error {
        Error::JoinConflict(conflict) => Some(*conflict),
        Error::Remote(remote) => {
            match remote.code.as_deref().map(str::to_ascii_uppercase).as_deref() {
                Some("ALREADY_ACTIVE") | Some("ACTIVE_CHALLENGE_EXISTS") => {
                    return Some(JoinConflict::AlreadyActiveElsewhere)
                }
                Some("SLOT_TAKEN") | Some("ALREADY_TAKEN") => return Some(JoinConflict::SlotTaken),
                _ => {}
            }
            [&remote.message, &remote.details]
                .into_iter()
                .flatten()
                .find_map(|text| classify_text(text))
        }
        _ => None,
    }
}

fn conflict_message(conflict: JoinConflict, active: Option<&CandidateItem>) -> String {
    match (conflict, active) {
        (JoinConflict::AlreadyActiveElsewhere, Some(active)) => format!(
            "{} Active challenge: {}.",
            ALREADY_ACTIVE_MESSAGE, active.title
        ),
        (JoinConflict::AlreadyActiveElsewhere, None) => ALREADY_ACTIVE_MESSAGE.to_string(),
        (JoinConflict::SlotTaken, _) => SLOT_TAKEN_MESSAGE.to_string(),
    }
}
