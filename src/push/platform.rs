use async_trait::async_trait;

use crate::push::error::PushResult;
use crate::push::types::PushSubscriptionDetails;

/// Host binding for the browser push manager of the worker registration.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Whether the host exposes a worker registration with a push manager.
    fn is_supported(&self) -> bool;

    async fn get_subscription(&self) -> PushResult<Option<PushSubscriptionDetails>>;

    /// Creates a user-visible subscription bound to `application_server_key`.
    async fn subscribe(&self, application_server_key: &[u8])
        -> PushResult<PushSubscriptionDetails>;

    /// Removes the current subscription. Returns `false` when there was none.
    async fn unsubscribe(&self) -> PushResult<bool>;
}
