//! Candidate feed: models, the TTL cache and the loader.

mod feed_cache;
mod feed_model;
mod feed_service;
mod feed_traits;

#[cfg(test)]
pub(crate) mod test_fixtures;


pub use feed_cache::FeedCache;
pub use feed_model::*;
pub use feed_service::FeedLoader;
pub use feed_traits::*;
