//! Local session snapshot shared by the session components.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use log::warn;

use super::{Session, SessionStore, UserProfile};
use crate::errors::Result;

/// Snapshot of the active session held by the session root.
///
/// Cloning shares the snapshot. Replaced wholesale on profile pushes and
/// cleared at sign-out.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn get(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| {
                warn!("Session snapshot lock was poisoned, recovering");
                poisoned.into_inner()
            })
            .clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.get().map(|s| s.user_id)
    }

    /// True if a session exists and belongs to `user_id`.
    pub fn is_current(&self, user_id: &str) -> bool {
        self.user_id().as_deref() == Some(user_id)
    }

    /// Replace the snapshot, returning the previous one.
    pub fn replace(&self, session: Option<Session>) -> Option<Session> {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| {
            warn!("Session snapshot lock was poisoned, recovering");
            poisoned.into_inner()
        });
        std::mem::replace(&mut *guard, session)
    }

    pub fn clear(&self) -> Option<Session> {
        self.replace(None)
    }
}

/// In-process session store, for embedding hosts and tests.
#[derive(Default)]
pub struct InMemorySessionStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    session: Option<Session>,
    profile: Option<UserProfile>,
}

impl InMemorySessionStore {
    pub fn new(session: Option<Session>) -> Self {
        let profile = session.as_ref().map(Session::to_profile);
        Self {
            state: Mutex::new(StoreState { session, profile }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Session store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn sign_out(&self) {
        *self.lock_state() = StoreState::default();
    }

    pub fn cached_profile(&self) -> Option<UserProfile> {
        self.lock_state().profile.clone()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn get_session(&self) -> Option<Session> {
        self.lock_state().session.clone()
    }

    async fn get_user_data(&self, _force_refresh: bool) -> Result<Option<UserProfile>> {
        Ok(self.lock_state().profile.clone())
    }

    /// Records for anyone but the signed-in user are dropped.
    async fn update_cached_user_data(&self, profile: UserProfile) -> Result<()> {
        let mut state = self.lock_state();
        let Some(session) = state.session.as_mut() else {
            return Ok(());
        };
        if session.user_id != profile.user_id {
            return Ok(());
        }
        session.apply_profile(&profile);
        state.profile = Some(profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_replace_returns_previous() {
        let ctx = SessionContext::new(Some(Session::new("a")));
        let shared = ctx.clone();

        let previous = ctx.replace(Some(Session::new("b")));
        assert_eq!(previous.unwrap().user_id, "a");
        assert!(shared.is_current("b"));
        assert!(!shared.is_current("a"));

        ctx.clear();
        assert!(shared.get().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_store_applies_profile_to_session() {
        let store = InMemorySessionStore::new(Some(Session::new("a")));
        let profile = UserProfile {
            user_id: "a".to_string(),
            winstreak: Some(7),
            ..Default::default()
        };
        store.update_cached_user_data(profile.clone()).await.unwrap();

        assert_eq!(store.get_session().unwrap().winstreak, Some(7));
        assert_eq!(store.get_user_data(true).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_in_memory_store_drops_foreign_profile() {
        let store = InMemorySessionStore::new(Some(Session::new("a")));
        store
            .update_cached_user_data(UserProfile {
                user_id: "b".to_string(),
                winstreak: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(store.get_session().unwrap().winstreak, None);
        assert_eq!(store.cached_profile().unwrap().user_id, "a");
    }
}
