//! Push subscription types.

use serde::{Deserialize, Serialize};

use crate::{DeliveryError, Result};

/// A browser push subscription.
///
/// Mirrors the JSON produced by `PushSubscription.toJSON()`, so values posted
/// by the client deserialize directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Endpoint URL issued by the push service.
    pub endpoint: String,
    /// Expiration time (Unix timestamp in milliseconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    /// Subscription keys.
    pub keys: SubscriptionKeys,
}

/// Web Push subscription keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// p256dh public key (URL-safe base64).
    pub p256dh: String,
    /// Auth secret (URL-safe base64).
    pub auth: String,
}

impl Subscription {
    /// Create a new subscription.
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    /// Set the expiration time (milliseconds since the Unix epoch).
    pub fn expires_at(mut self, millis: i64) -> Self {
        self.expiration_time = Some(millis);
        self
    }

    /// Check if the subscription is expired.
    pub fn is_expired(&self) -> bool {
        if let Some(expiration) = self.expiration_time {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();
            let now = i64::try_from(now).unwrap_or(i64::MAX);
            expiration < now
        } else {
            false
        }
    }

    /// Check that the endpoint is an absolute https URL and both keys are present.
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.endpoint)
            .map_err(|e| DeliveryError::InvalidSubscription(format!("endpoint: {}", e)))?;

        if endpoint.scheme() != "https" {
            return Err(DeliveryError::InvalidSubscription(format!(
                "endpoint must use https, got {}",
                endpoint.scheme()
            )));
        }

        if self.keys.p256dh.is_empty() || self.keys.auth.is_empty() {
            return Err(DeliveryError::InvalidSubscription(
                "missing p256dh or auth key".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_browser_json() {
        let json = r#"{
            "endpoint": "https://push.example.com/send/abc",
            "expirationTime": null,
            "keys": { "p256dh": "BNcRdreALRFX", "auth": "tBHItJI5svbpez7KI4CCXg" }
        }"#;

        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.endpoint, "https://push.example.com/send/abc");
        assert_eq!(sub.expiration_time, None);
        assert_eq!(sub.keys.auth, "tBHItJI5svbpez7KI4CCXg");
    }

    #[test]
    fn test_expiration() {
        let sub = Subscription::new("https://push.example.com/1", "p", "a");
        assert!(!sub.is_expired());
        assert!(sub.clone().expires_at(1).is_expired());
        assert!(!sub.expires_at(i64::MAX).is_expired());
    }

    #[test]
    fn test_expiration_extremes() {
        let sub = Subscription::new("https://push.example.com/1", "p", "a");
        assert!(sub.clone().expires_at(i64::MIN).is_expired());
        assert!(sub.clone().expires_at(-1).is_expired());
        assert!(!sub.expires_at(i64::MAX - 1).is_expired());
    }

    #[test]
    fn test_validate() {
        assert!(
            Subscription::new("https://push.example.com/1", "p", "a")
                .validate()
                .is_ok()
        );

        let err = Subscription::new("http://push.example.com/1", "p", "a")
            .validate()
            .unwrap_err();
        assert!(err.should_remove_subscription());

        assert!(Subscription::new("not a url", "p", "a").validate().is_err());
        assert!(
            Subscription::new("https://push.example.com/1", "", "a")
                .validate()
                .is_err()
        );
    }
}
