//! Gated join protocol: eligibility check, timed interstitial, single remote
//! join per session.

mod join_gate;
mod join_model;
mod join_traits;

#[cfg(test)]
mod join_gate_tests;

pub use join_gate::JoinGate;
pub use join_model::*;
pub use join_traits::*;

/// Shown when the backend reports the user already holds an active challenge.
pub const ALREADY_ACTIVE_MESSAGE: &str =
    "You already have an active challenge. Finish it before joining another one.";

/// Shown when another user took the slot first.
pub const SLOT_TAKEN_MESSAGE: &str = "Someone else just took this spot. Try another challenge.";

/// Shown when the eligibility check refuses without a reason.
pub const DEFAULT_BLOCKED_MESSAGE: &str = "You can't join a challenge right now.";
