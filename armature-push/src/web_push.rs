//! Web Push (VAPID) transport.

use async_trait::async_trait;
use tracing::debug;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushClient, WebPushMessageBuilder,
};

use crate::{DeliveryError, PushSender, Result, Subscription, VapidConfig};

/// Sends encrypted, VAPID-signed messages to browser push services.
pub struct WebPushSender {
    config: VapidConfig,
    client: web_push::IsahcWebPushClient,
}

impl WebPushSender {
    /// Create a new sender.
    pub fn new(config: VapidConfig) -> Result<Self> {
        config.validate()?;
        let client = web_push::IsahcWebPushClient::new()
            .map_err(|e| DeliveryError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// The public key clients must subscribe with.
    pub fn public_key(&self) -> &str {
        &self.config.public_key
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        subscription.validate()?;

        let subscription_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder = VapidSignatureBuilder::from_base64(
            &self.config.private_key,
            web_push::URL_SAFE_NO_PAD,
            &subscription_info,
        )
        .map_err(|e: web_push::WebPushError| DeliveryError::Config(e.to_string()))?;

        sig_builder.add_claim(
            "sub",
            serde_json::Value::String(self.config.subject.clone()),
        );

        let signature = sig_builder
            .build()
            .map_err(|e: web_push::WebPushError| DeliveryError::Config(e.to_string()))?;

        let mut builder = WebPushMessageBuilder::new(&subscription_info);
        builder.set_vapid_signature(signature);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_ttl(self.config.default_ttl);

        let message = builder
            .build()
            .map_err(|e| DeliveryError::Provider(e.to_string()))?;

        debug!(endpoint = %subscription.endpoint, "Sending web push notification");

        WebPushClient::send(&self.client, message)
            .await
            .map_err(DeliveryError::from)?;

        debug!("Web push notification sent successfully");
        Ok(())
    }
}
