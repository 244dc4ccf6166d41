//! Deckmatch Core - swipe matching session engine.
//!
//! This crate holds the client-resident session logic: the candidate feed and
//! its TTL cache, the gesture-driven deck, the gated join protocol and the
//! live profile sync. It is transport-agnostic and defines traits that are
//! implemented by the `connect` crate.

pub mod clock;
pub mod config;
pub mod constants;
pub mod deck;
pub mod errors;
pub mod events;
pub mod feed;
pub mod join;
pub mod live_sync;
pub mod session;
pub mod swipe;

pub use config::EngineConfig;
pub use swipe::{SwipeSession, SwipeSessionDeps};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
