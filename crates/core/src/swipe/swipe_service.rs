//! Session root.
//!
//! Owns one of each engine component for a signed-in user and routes input
//! through them: deck transitions first, then the join gate, with every
//! resulting fact published to the event sink.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use super::SwipeSessionDeps;
use crate::config::EngineConfig;
use crate::deck::{DeckEffect, DeckStateMachine, Transition, TransitionKind};
use crate::errors::{Error, Result};
use crate::events::{AlertKind, SwipeEvent, SwipeEventSink};
use crate::feed::{CandidateItem, Feed, FeedCache, FeedLoader, FeedMode};
use crate::join::{DismissOutcome, GateOutcome, JoinGate, PendingJoin};
use crate::live_sync::{LiveSync, LiveSyncReconciler, ReloadFlag};
use crate::session::{Session, SessionContext, SessionStore};

pub struct SwipeSession {
    config: EngineConfig,
    session: SessionContext,
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn SwipeEventSink>,
    cache: Arc<FeedCache>,
    loader: FeedLoader,
    deck: Mutex<DeckStateMachine>,
    gate: JoinGate,
    live_sync: LiveSync,
    reload: ReloadFlag,
}

impl SwipeSession {
    pub fn new(config: EngineConfig, deps: SwipeSessionDeps) -> Self {
        let session = SessionContext::default();
        let reload = ReloadFlag::new();
        let cache = Arc::new(FeedCache::new(config.cache_ttl(), deps.clock.clone()));

        let loader = FeedLoader::new(
            deps.source,
            deps.images,
            cache.clone(),
            session.clone(),
            config.placeholder_image.clone(),
        );
        let gate = JoinGate::new(
            deps.join_backend,
            session.clone(),
            deps.sink.clone(),
            deps.clock,
            config.interstitial_dwell(),
        );
        let reconciler = Arc::new(LiveSyncReconciler::new(
            session.clone(),
            deps.store.clone(),
            reload.clone(),
            deps.sink.clone(),
        ));
        let live_sync = LiveSync::new(deps.subscriber, reconciler);

        Self {
            deck: Mutex::new(DeckStateMachine::new(config.commit_threshold())),
            config,
            session,
            store: deps.store,
            sink: deps.sink,
            cache,
            loader,
            gate,
            live_sync,
            reload,
        }
    }

    fn lock_deck(&self) -> MutexGuard<'_, DeckStateMachine> {
        self.deck.lock().unwrap_or_else(|poisoned| {
            warn!("Deck mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn session(&self) -> Option<Session> {
        self.session.get()
    }

    /// Copy of the deck as it is now.
    pub fn deck(&self) -> DeckStateMachine {
        self.lock_deck().clone()
    }

    pub fn current(&self) -> Option<CandidateItem> {
        self.lock_deck().current().cloned()
    }

    pub fn pending_join(&self) -> Option<PendingJoin> {
        self.gate.pending_join()
    }

    pub fn cache(&self) -> &Arc<FeedCache> {
        &self.cache
    }

    pub fn reload_flag(&self) -> &ReloadFlag {
        &self.reload
    }

    pub fn is_live_sync_active(&self) -> bool {
        self.live_sync.is_active()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recompute the commit threshold for a new viewport width.
    pub fn set_viewport_width(&mut self, viewport_width: f64) {
        self.config.viewport_width = viewport_width;
        let threshold = self.config.commit_threshold();
        self.lock_deck().set_commit_threshold(threshold);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Seed the session from the store, subscribe to profile pushes and load
    /// the primary feed.
    pub async fn start(&self) -> Result<()> {
        let Some(mut session) = self.store.get_session() else {
            info!("No session available, redirecting to sign-in");
            self.sink.emit(SwipeEvent::SignInRequired);
            return Err(Error::NoSession);
        };

        match self.store.get_user_data(false).await {
            Ok(Some(profile)) if profile.user_id == session.user_id => {
                session.apply_profile(&profile)
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read user data for '{}': {}", session.user_id, e),
        }

        let previous = self.session.replace(Some(session.clone()));
        if previous.as_ref().map(|p| p.user_id.as_str()) != Some(session.user_id.as_str()) {
            if self.gate.cancel() {
                debug!("Cancelled pending join of the previous session");
            }
            self.reload.take();
        }
        info!("Session started for '{}'", session.user_id);

        if let Err(e) = self.live_sync.on_session_changed(Some(&session)).await {
            debug!("Live sync not established: {}", e);
        }

        self.load_primary(false).await
    }

    /// Sign-out: stop live sync, drop any pending join and clear the session.
    pub fn end(&self) {
        self.live_sync.stop();
        self.gate.cancel();
        self.reload.take();
        {
            let mut deck = self.lock_deck();
            *deck = DeckStateMachine::new(self.config.commit_threshold());
        }
        if let Some(previous) = self.session.clear() {
            info!("Session ended for '{}'", previous.user_id);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Feed loading
    // ─────────────────────────────────────────────────────────────────────

    /// Natural reload trigger. A reload flagged by a profile push invalidates
    /// the cache and forces a fetch; otherwise a valid cache entry is used.
    pub async fn reload(&self) -> Result<()> {
        self.ensure_not_joining()?;
        let force = self.reload.take();
        if force {
            info!("Applying scheduled feed reload");
            self.cache.invalidate();
        }
        self.load_primary(force).await
    }

    /// Switch to the exploration feed.
    pub async fn explore(&self) -> Result<()> {
        self.ensure_not_joining()?;
        let session = self.session.get().ok_or(Error::NoSession)?;

        match self.loader.load_expanded(&session).await {
            Ok(feed) => {
                if self.apply_feed(feed)? {
                    self.return_to_primary().await;
                }
                Ok(())
            }
            Err(e) => Err(self.handle_load_error(e, FeedMode::Expanded)),
        }
    }

    fn ensure_not_joining(&self) -> Result<()> {
        if self.is_joining(&self.lock_deck()) {
            debug!("Feed load refused: a join is still being resolved");
            return Err(Error::JoinInProgress);
        }
        Ok(())
    }

    fn is_joining(&self, deck: &DeckStateMachine) -> bool {
        deck.is_busy() || !self.gate.is_idle()
    }

    async fn load_primary(&self, force_refresh: bool) -> Result<()> {
        let session = self.session.get().ok_or(Error::NoSession)?;

        match self.loader.load_primary(&session, force_refresh).await {
            Ok(feed) => self.apply_feed(feed).map(|_| ()),
            Err(e) => Err(self.handle_load_error(e, FeedMode::Primary)),
        }
    }

    async fn return_to_primary(&self) {
        info!("Expanded feed exhausted, switching back to primary");
        if let Err(e) = self.load_primary(false).await {
            debug!("Primary reload after exploration failed: {}", e);
        }
    }

    /// Replace the deck. Returns true if an expanded deck came up empty.
    ///
    /// A feed that lands while a right commit is unresolved is discarded so
    /// the join keeps targeting the card it was committed on.
    fn apply_feed(&self, feed: Feed) -> Result<bool> {
        let count = feed.items.len();
        let effects = {
            let mut deck = self.lock_deck();
            if self.is_joining(&deck) {
                info!("Discarding {} feed: a join is still being resolved", feed.mode);
                return Err(Error::JoinInProgress);
            }
            deck.load(feed.items, feed.mode)
        };
        self.sink.emit(SwipeEvent::feed_loaded(feed.mode, count));
        Ok(self.publish(effects, feed.mode))
    }

    fn handle_load_error(&self, error: Error, mode: FeedMode) -> Error {
        if let Error::StaleSession(_) = error {
            return error;
        }
        warn!("Feed load ({}) failed: {}", mode, error);
        self.sink
            .emit(SwipeEvent::alert(AlertKind::LoadFailure, error.user_message()));
        let effects = {
            let mut deck = self.lock_deck();
            if self.is_joining(&deck) {
                debug!("Keeping the deck: a join is still being resolved");
                return error;
            }
            deck.load(Vec::new(), mode)
        };
        self.sink.emit(SwipeEvent::feed_loaded(mode, 0));
        self.publish(effects, mode);
        error
    }

    // ─────────────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────────────

    pub fn drag(&self, dx: f64, dy: f64) -> bool {
        self.lock_deck().drag(dx, dy)
    }

    pub fn cancel_drag(&self) {
        self.lock_deck().cancel_drag();
    }

    /// Release a drag. A right commit runs the eligibility check before this
    /// returns; the join itself waits for the interstitial to be dismissed.
    pub async fn release(&self, dx: f64, dy: f64) -> Result<Transition> {
        let (transition, mode) = {
            let mut deck = self.lock_deck();
            (deck.release(dx, dy)?, deck.mode())
        };
        self.after_commit(transition, mode).await
    }

    pub async fn skip(&self) -> Result<Transition> {
        let (transition, mode) = {
            let mut deck = self.lock_deck();
            (deck.commit_left()?, deck.mode())
        };
        self.after_commit(transition, mode).await
    }

    pub async fn commit_right(&self) -> Result<Transition> {
        let (transition, mode) = {
            let mut deck = self.lock_deck();
            (deck.commit_right()?, deck.mode())
        };
        self.after_commit(transition, mode).await
    }

    pub fn undo(&self) -> Result<Transition> {
        let (transition, mode) = {
            let mut deck = self.lock_deck();
            (deck.commit_back()?, deck.mode())
        };
        self.publish(transition.effects.clone(), mode);
        Ok(transition)
    }

    /// Sleep out the interstitial dwell. See [`JoinGate::wait_until_dismissible`].
    pub async fn wait_until_dismissible(&self) -> bool {
        self.gate.wait_until_dismissible().await
    }

    /// Dismiss the join interstitial, running the join once. The card
    /// advances only when the join succeeded.
    pub async fn dismiss_interstitial(&self) -> DismissOutcome {
        let outcome = self.gate.dismiss().await;
        let DismissOutcome::Completed(join) = &outcome else {
            return outcome;
        };

        let (effects, mode) = {
            let mut deck = self.lock_deck();
            let effects = deck.finish_right(join.is_joined()).unwrap_or_else(|e| {
                debug!("Join finished without a deck commit: {}", e);
                Vec::new()
            });
            (effects, deck.mode())
        };
        if self.publish(effects, mode) {
            self.return_to_primary().await;
        }
        outcome
    }

    async fn after_commit(&self, transition: Transition, mode: FeedMode) -> Result<Transition> {
        let expanded_exhausted = self.publish(transition.effects.clone(), mode);

        if transition.kind == TransitionKind::CommittedRight {
            if let Some(item) = transition.right_committed().cloned() {
                self.route_right_commit(item).await;
            }
        } else if expanded_exhausted {
            self.return_to_primary().await;
        }
        Ok(transition)
    }

    async fn route_right_commit(&self, item: CandidateItem) {
        let outcome = self.gate.on_right_commit(item).await;
        match outcome {
            GateOutcome::Opened(_) => {}
            GateOutcome::Blocked { .. }
            | GateOutcome::SignInRequired
            | GateOutcome::Busy
            | GateOutcome::Cancelled => {
                if let Err(e) = self.lock_deck().finish_right(false) {
                    debug!("Right commit already closed: {}", e);
                }
            }
        }
    }

    /// Emit events for deck effects. Returns true if an expanded deck was
    /// exhausted, which sends the caller back to the primary feed.
    fn publish(&self, effects: Vec<DeckEffect>, mode: FeedMode) -> bool {
        let mut expanded_exhausted = false;
        let events: Vec<SwipeEvent> = effects
            .into_iter()
            .map(|effect| match effect {
                DeckEffect::Skipped(item) => SwipeEvent::CardSkipped { item },
                DeckEffect::RightCommitted(item) => SwipeEvent::RightCommitted { item },
                DeckEffect::Restored(item) => SwipeEvent::CardRestored { item },
                DeckEffect::Exhausted => {
                    expanded_exhausted = mode == FeedMode::Expanded;
                    SwipeEvent::DeckExhausted { mode }
                }
            })
            .collect();
        self.sink.emit_batch(events);
        expanded_exhausted
    }
}
