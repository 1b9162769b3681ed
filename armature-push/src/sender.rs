//! Transport seam between the delivery adapter and a push service.

use async_trait::async_trait;

use crate::{Result, Subscription};

/// Sends an already-serialized payload to one subscription.
///
/// Encryption and VAPID signing are the sender's concern; callers hand over
/// plain JSON bytes.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver `payload` to `subscription`.
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()>;
}

#[async_trait]
impl<T: PushSender + ?Sized> PushSender for std::sync::Arc<T> {
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        (**self).send(subscription, payload).await
    }
}
