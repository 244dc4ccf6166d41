//! Deckmatch Connect - REST adapters for the Deckmatch session engine.
//!
//! This crate implements the engine's collaborator traits against the
//! challenge backend: candidate feeds, image resolution, the join protocol,
//! profile reads and a polling profile subscription.

pub mod client;
pub mod error;
pub mod profile_poller;
pub mod session_store;
pub mod types;

use async_trait::async_trait;
use deckmatch_core::session::UserProfile;

// Re-export commonly used types
pub use client::{DeckmatchApiClient, DEFAULT_API_URL};
pub use error::{ConnectError, Result};
pub use profile_poller::PollingProfileSubscriber;
pub use session_store::RemoteSessionStore;

/// Reads the backend's current profile record for a user.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> deckmatch_core::Result<Option<UserProfile>>;
}
