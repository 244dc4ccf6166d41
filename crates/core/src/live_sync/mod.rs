//! Live profile sync: push subscription lifecycle and reconciliation of
//! pushed profile records into the session.

mod live_sync_model;
mod live_sync_service;
mod live_sync_traits;


pub use live_sync_model::*;
pub use live_sync_service::{LiveSync, LiveSyncReconciler};
pub use live_sync_traits::*;
