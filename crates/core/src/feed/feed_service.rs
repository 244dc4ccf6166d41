//! Fetches and enriches the candidate queue.

use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};

use super::{CandidateItem, CandidateSource, Feed, FeedCache, FeedMode, ImageResolver};
use crate::errors::{Error, Result};
use crate::session::{Session, SessionContext};

/// Loads primary and expanded feeds for the current session.
///
/// Primary loads read and write the shared [`FeedCache`]; expanded loads
/// bypass it in both directions. A response is discarded if the session that
/// requested it is no longer the current one.
pub struct FeedLoader {
    source: Arc<dyn CandidateSource>,
    images: Arc<dyn ImageResolver>,
    cache: Arc<FeedCache>,
    session: SessionContext,
    placeholder_image: String,
}

impl FeedLoader {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        images: Arc<dyn ImageResolver>,
        cache: Arc<FeedCache>,
        session: SessionContext,
        placeholder_image: impl Into<String>,
    ) -> Self {
        Self {
            source,
            images,
            cache,
            session,
            placeholder_image: placeholder_image.into(),
        }
    }

    /// Load the eligibility-filtered feed.
    ///
    /// A valid cache entry for the user is served unless `force_refresh` is
    /// set. On fetch failure the error is returned and the cache is left as
    /// it was; callers show an empty deck rather than older data.
    pub async fn load_primary(&self, session: &Session, force_refresh: bool) -> Result<Feed> {
        let user_id = session.user_id.as_str();

        if !force_refresh {
            if let Some(items) = self.cache.get(user_id) {
                debug!("Serving {} cached candidate(s) for '{}'", items.len(), user_id);
                return Ok(Feed {
                    mode: FeedMode::Primary,
                    items,
                    from_cache: true,
                });
            }
        }

        let bucket = session.eligibility_bucket();
        let fetched = self
            .source
            .fetch_eligible_candidates(user_id, &bucket)
            .await
            .map_err(|e| {
                warn!("Primary feed fetch failed for '{}': {}", user_id, e);
                Error::Load(e.user_message())
            })?;
        self.ensure_current(user_id)?;

        let items = self.enrich(fetched).await;
        self.ensure_current(user_id)?;

        self.cache.put(user_id, &items);
        info!("Loaded {} primary candidate(s) for '{}'", items.len(), user_id);

        Ok(Feed {
            mode: FeedMode::Primary,
            items,
            from_cache: false,
        })
    }

    /// Load the exploration feed. Never touches the cache.
    pub async fn load_expanded(&self, session: &Session) -> Result<Feed> {
        let user_id = session.user_id.as_str();

        let fetched = self
            .source
            .fetch_expanded_candidates(user_id)
            .await
            .map_err(|e| {
                warn!("Expanded feed fetch failed for '{}': {}", user_id, e);
                Error::Load(e.user_message())
            })?;
        self.ensure_current(user_id)?;

        let items = self.enrich(fetched).await;
        self.ensure_current(user_id)?;

        info!("Loaded {} expanded candidate(s) for '{}'", items.len(), user_id);

        Ok(Feed {
            mode: FeedMode::Expanded,
            items,
            from_cache: false,
        })
    }

    fn ensure_current(&self, user_id: &str) -> Result<()> {
        if self.session.is_current(user_id) {
            Ok(())
        } else {
            debug!("Discarding feed response for '{}': session changed", user_id);
            Err(Error::StaleSession(user_id.to_string()))
        }
    }

    /// Resolve display images. Order is preserved; failures degrade to the
    /// placeholder.
    async fn enrich(&self, items: Vec<CandidateItem>) -> Vec<CandidateItem> {
        let resolved = join_all(items.iter().map(|item| self.resolve_display_image(item))).await;

        items
            .into_iter()
            .zip(resolved)
            .map(|(item, url)| CandidateItem {
                display_image: Some(url),
                ..item
            })
            .collect()
    }

    async fn resolve_display_image(&self, item: &CandidateItem) -> String {
        let Some(raw_ref) = item.host_image_ref.as_deref().filter(|r| !r.is_empty()) else {
            return self.placeholder_image.clone();
        };

        match self.images.resolve_image(raw_ref).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug!("Image '{}' for candidate '{}' did not resolve", raw_ref, item.id);
                self.placeholder_image.clone()
            }
            Err(e) => {
                warn!("Image resolution failed for candidate '{}': {}", item.id, e);
                self.placeholder_image.clone()
            }
        }
    }
}
