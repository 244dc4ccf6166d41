//! Session-data store backed by the profile endpoint.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, warn};

use deckmatch_core::errors::Result;
use deckmatch_core::session::{Session, SessionStore, UserProfile};

use crate::ProfileFetcher;

#[derive(Default)]
struct StoreState {
    session: Option<Session>,
    profile: Option<UserProfile>,
}

/// Holds the session produced by sign-in and caches the user's profile
/// record, refetching it from the backend on demand.
pub struct RemoteSessionStore {
    fetcher: Arc<dyn ProfileFetcher>,
    state: Mutex<StoreState>,
}

impl RemoteSessionStore {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>, session: Option<Session>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(StoreState {
                session,
                profile: None,
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Session store mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Install the session of a new sign-in, dropping any cached record.
    pub fn sign_in(&self, session: Session) {
        let mut state = self.lock_state();
        state.session = Some(session);
        state.profile = None;
    }

    pub fn sign_out(&self) {
        *self.lock_state() = StoreState::default();
    }
}

#[async_trait]
impl SessionStore for RemoteSessionStore {
    fn get_session(&self) -> Option<Session> {
        self.lock_state().session.clone()
    }

    async fn get_user_data(&self, force_refresh: bool) -> Result<Option<UserProfile>> {
        let user_id = {
            let state = self.lock_state();
            let Some(session) = state.session.as_ref() else {
                return Ok(None);
            };
            if !force_refresh {
                if let Some(profile) = state.profile.clone() {
                    return Ok(Some(profile));
                }
            }
            session.user_id.clone()
        };

        debug!("Fetching user data for '{}'", user_id);
        let fetched = self.fetcher.fetch_profile(&user_id).await?;

        let mut state = self.lock_state();
        if state.session.as_ref().map(|s| s.user_id.as_str()) == Some(user_id.as_str()) {
            state.profile = fetched.clone();
        }
        Ok(fetched)
    }

    async fn update_cached_user_data(&self, profile: UserProfile) -> Result<()> {
        let mut state = self.lock_state();
        let owned = state
            .session
            .as_ref()
            .is_some_and(|s| s.user_id == profile.user_id);
        if !owned {
            debug!("Dropping user data for '{}': not the signed-in user", profile.user_id);
            return Ok(());
        }
        if let Some(session) = state.session.as_mut() {
            session.apply_profile(&profile);
        }
        state.profile = Some(profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProfileFetcher for CountingFetcher {
        async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) as u32;
            Ok(Some(UserProfile {
                user_id: user_id.to_string(),
                winstreak: Some(calls),
                ..Default::default()
            }))
        }
    }

    fn store() -> (Arc<CountingFetcher>, RemoteSessionStore) {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
        });
        let store = RemoteSessionStore::new(fetcher.clone(), Some(Session::new("user-1")));
        (fetcher, store)
    }

    #[tokio::test]
    async fn test_user_data_is_cached_until_forced() {
        let (fetcher, store) = store();

        assert_eq!(store.get_user_data(false).await.unwrap().unwrap().winstreak, Some(0));
        assert_eq!(store.get_user_data(false).await.unwrap().unwrap().winstreak, Some(0));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        assert_eq!(store.get_user_data(true).await.unwrap().unwrap().winstreak, Some(1));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_cached_record_and_session() {
        let (fetcher, store) = store();

        store
            .update_cached_user_data(UserProfile {
                user_id: "user-1".to_string(),
                winstreak: Some(9),
                city: Some("Austin".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(store.get_session().unwrap().winstreak, Some(9));
        assert_eq!(store.get_user_data(false).await.unwrap().unwrap().winstreak, Some(9));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signed_out_store_has_no_data() {
        let (fetcher, store) = store();
        store.sign_out();

        assert!(store.get_session().is_none());
        assert!(store.get_user_data(true).await.unwrap().is_none());
        store
            .update_cached_user_data(UserProfile {
                user_id: "user-1".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(store.get_session().is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
