//! Reconciles pushed profile records into the session and owns the
//! subscription lifecycle.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{
    ProfileSubscriber, ProfileSubscription, PushEvent, ReconcileOutcome, ReloadFlag,
    SubscriptionHandle,
};
use crate::errors::{Error, Result};
use crate::events::{SwipeEvent, SwipeEventSink};
use crate::session::{Session, SessionContext, SessionStore};

/// Applies push events to the session snapshot and the session-data store.
pub struct LiveSyncReconciler {
    session: SessionContext,
    store: Arc<dyn SessionStore>,
    reload: ReloadFlag,
    sink: Arc<dyn SwipeEventSink>,
}

impl LiveSyncReconciler {
    pub fn new(
        session: SessionContext,
        store: Arc<dyn SessionStore>,
        reload: ReloadFlag,
        sink: Arc<dyn SwipeEventSink>,
    ) -> Self {
        Self {
            session,
            store,
            reload,
            sink,
        }
    }

    /// Apply one event received on the subscription for `subscribed_user`.
    ///
    /// The snapshot is replaced wholesale, then the store is updated. A
    /// winstreak change only marks the feed for reload.
    pub async fn apply(&self, subscribed_user: &str, event: PushEvent) -> ReconcileOutcome {
        let profile = match event {
            PushEvent::ProfileChanged(profile) => profile,
            PushEvent::Disconnected { reason } => {
                debug!("Profile channel for '{}' disconnected: {}", subscribed_user, reason);
                return ReconcileOutcome::Disconnected;
            }
        };

        if profile.user_id != subscribed_user {
            debug!(
                "Ignoring profile push for '{}' on subscription of '{}'",
                profile.user_id, subscribed_user
            );
            return ReconcileOutcome::Ignored;
        }

        let Some(mut session) = self.session.get().filter(|s| s.user_id == profile.user_id)
        else {
            debug!("Ignoring profile push for '{}': session ended", profile.user_id);
            return ReconcileOutcome::Ignored;
        };

        let previous_winstreak = session.winstreak;
        session.apply_profile(&profile);
        self.session.replace(Some(session));

        if let Err(e) = self.store.update_cached_user_data(profile.clone()).await {
            warn!(
                "Failed to update cached user data for '{}': {}",
                profile.user_id, e
            );
        }

        let reload_scheduled = previous_winstreak != profile.winstreak;
        if reload_scheduled {
            info!(
                "Winstreak of '{}' changed from {:?} to {:?}, feed reload due",
                profile.user_id, previous_winstreak, profile.winstreak
            );
            if self.reload.mark() {
                self.sink.emit(SwipeEvent::FeedReloadScheduled);
            }
        }

        ReconcileOutcome::Applied { reload_scheduled }
    }

    /// Drain a subscription channel until it closes.
    pub async fn run(&self, subscribed_user: String, mut rx: mpsc::UnboundedReceiver<PushEvent>) {
        info!("Live sync worker started for '{}'", subscribed_user);
        while let Some(event) = rx.recv().await {
            self.apply(&subscribed_user, event).await;
        }
        info!("Live sync worker for '{}' shutting down", subscribed_user);
    }
}

struct ActiveSubscription {
    user_id: String,
    handle: Box<dyn SubscriptionHandle>,
    worker: JoinHandle<()>,
}

impl ActiveSubscription {
    fn shutdown(self) {
        self.handle.unsubscribe();
        self.worker.abort();
    }
}

/// Subscription lifecycle for the session root.
///
/// At most one subscription is active. It follows the session identity:
/// established when one becomes available, replaced when it changes and
/// torn down when the session ends.
pub struct LiveSync {
    subscriber: Arc<dyn ProfileSubscriber>,
    reconciler: Arc<LiveSyncReconciler>,
    active: Mutex<Option<ActiveSubscription>>,
}

impl LiveSync {
    pub fn new(subscriber: Arc<dyn ProfileSubscriber>, reconciler: Arc<LiveSyncReconciler>) -> Self {
        Self {
            subscriber,
            reconciler,
            active: Mutex::new(None),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSubscription>> {
        self.active.lock().unwrap_or_else(|poisoned| {
            warn!("Live sync mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// User id of the active subscription, if any.
    pub fn active_user(&self) -> Option<String> {
        self.lock_active().as_ref().map(|a| a.user_id.clone())
    }

    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Subscribe for `user_id`, replacing a subscription for anyone else.
    ///
    /// A no-op if the user is already subscribed. Callers treat failures as
    /// silent; the next identity change retries.
    pub async fn start(&self, user_id: &str) -> Result<()> {
        if self.active_user().as_deref() == Some(user_id) {
            return Ok(());
        }
        self.stop();

        let ProfileSubscription { handle, events } =
            self.subscriber.subscribe(user_id).await.map_err(|e| {
                warn!("Profile subscription for '{}' failed: {}", user_id, e);
                Error::Subscription(e.to_string())
            })?;

        let reconciler = self.reconciler.clone();
        let owner = user_id.to_string();
        let worker = tokio::spawn(async move {
            reconciler.run(owner, events).await;
        });
        let next = ActiveSubscription {
            user_id: user_id.to_string(),
            handle,
            worker,
        };

        let replaced = self.lock_active().replace(next);
        if let Some(replaced) = replaced {
            debug!("Replacing concurrent subscription for '{}'", replaced.user_id);
            replaced.shutdown();
        }
        info!("Live sync subscribed for '{}'", user_id);
        Ok(())
    }

    /// Tear down the active subscription, if any.
    pub fn stop(&self) {
        let active = self.lock_active().take();
        if let Some(active) = active {
            info!("Live sync unsubscribed for '{}'", active.user_id);
            active.shutdown();
        }
    }

    /// Follow a change of session identity.
    pub async fn on_session_changed(&self, session: Option<&Session>) -> Result<()> {
        match session {
            Some(session) => self.start(&session.user_id).await,
            None => {
                self.stop();
                Ok(())
            }
        }
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        self.stop();
    }
}
