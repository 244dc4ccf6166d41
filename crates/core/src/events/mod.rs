//! Session events.
//!
//! Provides the event types and the sink trait the engine emits through after
//! state changes. Hosts implement the sink to drive their presentation layer.

mod sink;
mod swipe_event;

pub use sink::*;
pub use swipe_event::*;
