//! Outbound channel from the session engine to the presentation layer.

use std::sync::{Arc, Mutex};

use super::{AlertKind, SwipeEvent};

/// Receives [`SwipeEvent`]s after the session state they describe has
/// already changed.
///
/// Events arrive in transition order, emitted from synchronous code between
/// awaits, so implementations should hand them off without blocking. Nothing
/// flows back: a host that drops events leaves deck and join state unaffected.
pub trait SwipeEventSink: Send + Sync {
    fn emit(&self, event: SwipeEvent);

    /// Forwards each event to `emit`, preserving order.
    fn emit_batch(&self, events: Vec<SwipeEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Sink for headless sessions.
#[derive(Clone, Default)]
pub struct NoOpSwipeEventSink;

impl SwipeEventSink for NoOpSwipeEventSink {
    fn emit(&self, _event: SwipeEvent) {}
}

/// Records every event; used by the engine's tests and by embedding hosts
/// that assert on the event stream.
#[derive(Clone, Default)]
pub struct MockSwipeEventSink {
    events: Arc<Mutex<Vec<SwipeEvent>>>,
}

impl MockSwipeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    pub fn events(&self) -> Vec<SwipeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns the messages of collected alerts of the given kind.
    pub fn alerts(&self, kind: AlertKind) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                SwipeEvent::Alert { kind: k, message } if *k == kind => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Counts collected events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&SwipeEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl SwipeEventSink for MockSwipeEventSink {
    fn emit(&self, event: SwipeEvent) {
        self.events.lock().unwrap().push(event);
    }
}
