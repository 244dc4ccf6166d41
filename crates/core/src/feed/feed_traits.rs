//! Contracts for the collaborators that supply candidates.

use async_trait::async_trait;

use super::CandidateItem;
use crate::errors::Result;
use crate::session::EligibilityBucket;

/// Source of candidate challenges, owned by the backend.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Ordered candidates filtered by the user's eligibility bucket.
    async fn fetch_eligible_candidates(
        &self,
        user_id: &str,
        bucket: &EligibilityBucket,
    ) -> Result<Vec<CandidateItem>>;

    /// Ordered candidates with locality and eligibility filters relaxed.
    async fn fetch_expanded_candidates(&self, user_id: &str) -> Result<Vec<CandidateItem>>;
}

/// Turns a raw image reference into a displayable URL.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// Returns `Ok(None)` if the reference does not resolve.
    async fn resolve_image(&self, raw_ref: &str) -> Result<Option<String>>;
}
