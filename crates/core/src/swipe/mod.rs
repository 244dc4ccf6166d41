//! Swipe session root wiring the feed, deck, join gate and live sync.

use std::sync::Arc;

use crate::clock::Clock;
use crate::events::SwipeEventSink;
use crate::feed::{CandidateSource, ImageResolver};
use crate::join::JoinBackend;
use crate::live_sync::ProfileSubscriber;
use crate::session::SessionStore;

mod swipe_service;


pub use swipe_service::SwipeSession;

/// External collaborators of a [`SwipeSession`].
pub struct SwipeSessionDeps {
    pub source: Arc<dyn CandidateSource>,
    pub images: Arc<dyn ImageResolver>,
    pub join_backend: Arc<dyn JoinBackend>,
    pub subscriber: Arc<dyn ProfileSubscriber>,
    pub store: Arc<dyn SessionStore>,
    pub sink: Arc<dyn SwipeEventSink>,
    pub clock: Arc<dyn Clock>,
}
