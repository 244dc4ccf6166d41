use async_trait::async_trait;

use super::{EligibilityDecision, JoinResponse};
use crate::errors::Result;

/// Remote side of the join protocol.
///
/// `can_join` is advisory; the backend enforces eligibility again inside
/// `join`.
#[async_trait]
pub trait JoinBackend: Send + Sync {
    async fn can_join(&self, user_id: &str) -> Result<EligibilityDecision>;

    async fn join(
        &self,
        candidate_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<JoinResponse>;
}
