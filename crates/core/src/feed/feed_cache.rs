//! Single-slot, TTL-bounded snapshot of one user's primary feed.
//!
//! The cache is an explicit instance owned by the session root and shared with
//! the loader. It holds at most one entry: a `put` for any user overwrites
//! whatever was stored before. An entry is served only to its owner and only
//! while younger than the TTL. Explicit invalidation overrides the TTL.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use super::CandidateItem;
use crate::clock::Clock;

#[derive(Debug, Clone)]
struct CacheEntry {
    owner_id: String,
    items: Vec<CandidateItem>,
    stored_at: DateTime<Utc>,
}

pub struct FeedCache {
    entry: Mutex<Option<CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FeedCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl,
            clock,
        }
    }

    fn lock_entry(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry.lock().unwrap_or_else(|poisoned| {
            warn!("Feed cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Cached items for `user_id`, or `None` if absent, owned by someone else,
    /// or aged to the TTL or beyond.
    pub fn get(&self, user_id: &str) -> Option<Vec<CandidateItem>> {
        let entry = self.lock_entry();
        let entry = entry.as_ref()?;

        if entry.owner_id != user_id {
            debug!("Feed cache miss: entry belongs to another user");
            return None;
        }

        let age = self.clock.now() - entry.stored_at;
        if age >= self.ttl {
            debug!(
                "Feed cache miss: entry for '{}' is {} ms old",
                user_id,
                age.num_milliseconds()
            );
            return None;
        }

        Some(entry.items.clone())
    }

    /// Store a copy of `items` for `user_id`, replacing any prior entry.
    pub fn put(&self, user_id: &str, items: &[CandidateItem]) {
        debug!("Feed cache put: {} item(s) for '{}'", items.len(), user_id);
        *self.lock_entry() = Some(CacheEntry {
            owner_id: user_id.to_string(),
            items: items.to_vec(),
            stored_at: self.clock.now(),
        });
    }

    pub fn invalidate(&self) {
        if self.lock_entry().take().is_some() {
            debug!("Feed cache invalidated");
        }
    }

    /// Age of the entry if it belongs to `user_id`, regardless of validity.
    pub fn age(&self, user_id: &str) -> Option<Duration> {
        let entry = self.lock_entry();
        entry
            .as_ref()
            .filter(|e| e.owner_id == user_id)
            .map(|e| self.clock.now() - e.stored_at)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
