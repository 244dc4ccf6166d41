//! Profile subscription backed by periodic polling.
//!
//! The backend exposes no push channel to this client, so a background task
//! polls the profile endpoint on a fixed interval and turns observed changes
//! into [`PushEvent`]s.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use deckmatch_core::errors::{Error, Result};
use deckmatch_core::live_sync::{
    ProfileSubscriber, ProfileSubscription, PushEvent, SubscriptionHandle,
};
use deckmatch_core::session::UserProfile;

use crate::ProfileFetcher;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

pub struct PollingProfileSubscriber {
    fetcher: Arc<dyn ProfileFetcher>,
    interval: Duration,
}

impl PollingProfileSubscriber {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>, interval: Duration) -> Self {
        Self { fetcher, interval }
    }
}

#[async_trait]
impl ProfileSubscriber for PollingProfileSubscriber {
    /// Fetches the current profile as the baseline, then starts polling.
    /// A failing baseline fetch fails the subscription.
    async fn subscribe(&self, user_id: &str) -> Result<ProfileSubscription> {
        let baseline = self
            .fetcher
            .fetch_profile(user_id)
            .await
            .map_err(|e| Error::Subscription(e.user_message()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(poll_profile(
            self.fetcher.clone(),
            user_id.to_string(),
            self.interval,
            ChangeTracker::new(baseline),
            tx,
        ));

        Ok(ProfileSubscription {
            handle: Box::new(PollHandle {
                worker: Mutex::new(Some(worker)),
            }),
            events: rx,
        })
    }
}

struct PollHandle {
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionHandle for PollHandle {
    fn unsubscribe(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(worker) = worker {
            worker.abort();
        }
    }
}

async fn poll_profile(
    fetcher: Arc<dyn ProfileFetcher>,
    user_id: String,
    every: Duration,
    mut tracker: ChangeTracker,
    tx: mpsc::UnboundedSender<PushEvent>,
) {
    info!(
        "Profile poller started for '{}' ({} ms interval)",
        user_id,
        every.as_millis()
    );

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick is immediate; the baseline was fetched at subscribe time.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if tx.is_closed() {
            break;
        }

        let event = match fetcher.fetch_profile(&user_id).await {
            Ok(Some(profile)) => tracker.observe(profile),
            Ok(None) => {
                debug!("Profile poll for '{}' returned no record", user_id);
                None
            }
            Err(e) => {
                warn!("Profile poll for '{}' failed: {}", user_id, e);
                tracker.fail(e.user_message())
            }
        };

        if let Some(event) = event {
            if tx.send(event).is_err() {
                break;
            }
        }
    }

    info!("Profile poller for '{}' shutting down", user_id);
}

/// Turns successive poll results into change and disconnect events.
#[derive(Debug, Clone)]
struct ChangeTracker {
    last: Option<UserProfile>,
    connected: bool,
}

impl ChangeTracker {
    fn new(baseline: Option<UserProfile>) -> Self {
        Self {
            last: baseline,
            connected: true,
        }
    }

    /// A changed record yields `ProfileChanged`. Records carrying
    /// `updated_at` on both sides are compared by it alone.
    fn observe(&mut self, profile: UserProfile) -> Option<PushEvent> {
        self.connected = true;
        let changed = match &self.last {
            None => true,
            Some(last) => match (last.updated_at, profile.updated_at) {
                (Some(previous), Some(current)) => previous != current,
                _ => *last != profile,
            },
        };
        if !changed {
            return None;
        }
        self.last = Some(profile.clone());
        Some(PushEvent::ProfileChanged(profile))
    }

    /// The first failure of an outage yields `Disconnected`.
    fn fail(&mut self, reason: String) -> Option<PushEvent> {
        if !self.connected {
            return None;
        }
        self.connected = false;
        Some(PushEvent::Disconnected { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use deckmatch_core::errors::RemoteError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn profile(winstreak: u32, updated_secs: Option<i64>) -> UserProfile {
        UserProfile {
            user_id: "user-1".to_string(),
            winstreak: Some(winstreak),
            updated_at: updated_secs
                .map(|s| DateTime::<Utc>::UNIX_EPOCH + ChronoDuration::seconds(s)),
            ..Default::default()
        }
    }

    #[test]
    fn test_tracker_compares_by_updated_at() {
        let mut tracker = ChangeTracker::new(Some(profile(1, Some(10))));

        assert_eq!(tracker.observe(profile(1, Some(10))), None);
        // Same timestamp wins over differing attributes.
        assert_eq!(tracker.observe(profile(2, Some(10))), None);
        assert_eq!(
            tracker.observe(profile(2, Some(11))),
            Some(PushEvent::ProfileChanged(profile(2, Some(11))))
        );
    }

    #[test]
    fn test_tracker_compares_records_without_timestamps() {
        let mut tracker = ChangeTracker::new(None);

        assert!(tracker.observe(profile(1, None)).is_some());
        assert_eq!(tracker.observe(profile(1, None)), None);
        assert!(tracker.observe(profile(2, None)).is_some());
    }

    #[test]
    fn test_tracker_reports_each_outage_once() {
        let mut tracker = ChangeTracker::new(Some(profile(1, Some(1))));

        assert!(matches!(
            tracker.fail("timeout".to_string()),
            Some(PushEvent::Disconnected { .. })
        ));
        assert_eq!(tracker.fail("timeout".to_string()), None);

        assert_eq!(tracker.observe(profile(1, Some(1))), None);
        assert!(tracker.fail("reset".to_string()).is_some());
    }

    // --- Mock ProfileFetcher ---
    struct ScriptedFetcher {
        script: Mutex<VecDeque<deckmatch_core::Result<Option<UserProfile>>>>,
        fallback: UserProfile,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(
            script: Vec<deckmatch_core::Result<Option<UserProfile>>>,
            fallback: UserProfile,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProfileFetcher for ScriptedFetcher {
        async fn fetch_profile(&self, _user_id: &str) -> deckmatch_core::Result<Option<UserProfile>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Some(self.fallback.clone())))
        }
    }

    fn offline() -> Error {
        Error::Remote(RemoteError::message("offline"))
    }

    #[tokio::test]
    async fn test_subscription_emits_changes_and_disconnects() {
        let fetcher = Arc::new(ScriptedFetcher::new(
            vec![
                Ok(Some(profile(1, Some(1)))),
                Ok(Some(profile(1, Some(1)))),
                Err(offline()),
                Err(offline()),
                Ok(Some(profile(2, Some(2)))),
            ],
            profile(2, Some(2)),
        ));
        let subscriber = PollingProfileSubscriber::new(fetcher.clone(), Duration::from_millis(5));

        let mut subscription = subscriber.subscribe("user-1").await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), subscription.events.recv())
            .await
            .unwrap();
        assert_eq!(
            first,
            Some(PushEvent::Disconnected {
                reason: "offline".to_string()
            })
        );

        let second = tokio::time::timeout(Duration::from_secs(2), subscription.events.recv())
            .await
            .unwrap();
        assert_eq!(second, Some(PushEvent::ProfileChanged(profile(2, Some(2)))));

        subscription.handle.unsubscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = fetcher.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_failing_baseline_fails_subscription() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(offline())], profile(1, None)));
        let subscriber = PollingProfileSubscriber::new(fetcher, Duration::from_millis(5));

        let result = subscriber.subscribe("user-1").await;

        assert!(matches!(result, Err(Error::Subscription(message)) if message == "offline"));
    }
}
