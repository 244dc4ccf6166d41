use async_trait::async_trait;
use tokio::sync::mpsc;

use super::PushEvent;
use crate::errors::Result;

/// Handle that tears a subscription down.
pub trait SubscriptionHandle: Send + Sync {
    /// Stop delivery. Must be idempotent.
    fn unsubscribe(&self);
}

/// An established subscription: its handle plus the typed event channel.
pub struct ProfileSubscription {
    pub handle: Box<dyn SubscriptionHandle>,
    pub events: mpsc::UnboundedReceiver<PushEvent>,
}

/// Push channel for profile changes scoped to one user id.
#[async_trait]
pub trait ProfileSubscriber: Send + Sync {
    async fn subscribe(&self, user_id: &str) -> Result<ProfileSubscription>;
}
