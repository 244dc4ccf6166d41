//! Session-data store contract.

use async_trait::async_trait;

use super::{Session, UserProfile};
use crate::errors::Result;

/// Access to the externally owned session and its cached user record.
///
/// Sign-in and bootstrap live outside the engine; this trait only reads what
/// they produced and writes back profile updates the engine received.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current session, if someone is signed in.
    fn get_session(&self) -> Option<Session>;

    /// Cached user record. `force_refresh` bypasses any store-side cache.
    async fn get_user_data(&self, force_refresh: bool) -> Result<Option<UserProfile>>;

    /// Replace the cached user record so later reads observe it.
    async fn update_cached_user_data(&self, profile: UserProfile) -> Result<()>;
}
