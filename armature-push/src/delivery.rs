//! Delivery adapter: sends notification payloads to stored subscriptions.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::payload::encode_payload;
use crate::{DeliveryError, PushSender, Subscription};

/// Outcome of delivering to a single subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    /// Endpoint the payload was sent to.
    pub endpoint: String,
    /// Whether the push service accepted the message.
    pub success: bool,
    /// Failure message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The subscription is dead and should be deleted from storage.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub remove: bool,
}

impl DeliveryOutcome {
    fn delivered(subscription: &Subscription) -> Self {
        Self {
            endpoint: subscription.endpoint.clone(),
            success: true,
            error: None,
            remove: false,
        }
    }

    fn failed(subscription: &Subscription, error: &DeliveryError) -> Self {
        Self {
            endpoint: subscription.endpoint.clone(),
            success: false,
            error: Some(error.to_string()),
            remove: error.should_remove_subscription(),
        }
    }
}

/// Aggregate result of a bulk send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDelivery {
    /// Number of accepted deliveries.
    pub successful: usize,
    /// Number of failed deliveries.
    pub failed: usize,
    /// Per-subscription outcomes, in input order.
    pub results: Vec<DeliveryOutcome>,
}

impl BulkDelivery {
    fn from_results(results: Vec<DeliveryOutcome>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            successful,
            failed: results.len() - successful,
            results,
        }
    }

    /// Endpoints the push service reported as gone.
    pub fn stale_endpoints(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.remove)
            .map(|r| r.endpoint.as_str())
    }
}

/// Server-side push delivery.
///
/// Individual delivery failures never surface as errors; they are reported
/// in the returned outcome so one bad subscription cannot abort a broadcast.
#[derive(Clone)]
pub struct ServerPush {
    sender: Arc<dyn PushSender>,
}

impl ServerPush {
    /// Create a delivery adapter over any sender.
    pub fn new(sender: impl PushSender + 'static) -> Self {
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create an adapter backed by the Web Push protocol.
    #[cfg(feature = "web-push")]
    pub fn web_push(config: crate::VapidConfig) -> crate::Result<Self> {
        Ok(Self::new(crate::WebPushSender::new(config)?))
    }

    /// Send a payload to one subscription.
    pub async fn send_notification<P>(&self, subscription: &Subscription, payload: &P) -> DeliveryOutcome
    where
        P: Serialize + ?Sized,
    {
        match encode_payload(payload) {
            Ok(body) => self.deliver(subscription, &body).await,
            Err(e) => DeliveryOutcome::failed(subscription, &e),
        }
    }

    /// Send a payload to every subscription concurrently.
    pub async fn send_notification_to_all<P>(
        &self,
        subscriptions: &[Subscription],
        payload: &P,
    ) -> BulkDelivery
    where
        P: Serialize + ?Sized,
    {
        let body = match encode_payload(payload) {
            Ok(body) => body,
            Err(e) => {
                return BulkDelivery::from_results(
                    subscriptions
                        .iter()
                        .map(|s| DeliveryOutcome::failed(s, &e))
                        .collect(),
                );
            }
        };

        let results = join_all(subscriptions.iter().map(|s| self.deliver(s, &body))).await;
        let bulk = BulkDelivery::from_results(results);

        debug!(
            successful = bulk.successful,
            failed = bulk.failed,
            "Bulk push delivery finished"
        );
        bulk
    }

    async fn deliver(&self, subscription: &Subscription, body: &[u8]) -> DeliveryOutcome {
        match self.sender.send(subscription, body).await {
            Ok(()) => DeliveryOutcome::delivered(subscription),
            Err(e) => {
                warn!(endpoint = %subscription.endpoint, error = %e, "Push delivery failed");
                DeliveryOutcome::failed(subscription, &e)
            }
        }
    }
}
