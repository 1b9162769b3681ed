//! Push delivery error types.

use thiserror::Error;

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors raised while delivering a notification to a subscription.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Malformed subscription (bad endpoint or key material).
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    /// The push service no longer knows this subscription.
    #[error("Subscription gone: {0}")]
    Gone(String),

    /// VAPID authentication rejected by the push service.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Rate limited.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Payload too large.
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },

    /// Push service or transport error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DeliveryError {
    /// Check if the subscription should be dropped from storage.
    pub fn should_remove_subscription(&self) -> bool {
        matches!(self, Self::Gone(_) | Self::InvalidSubscription(_))
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::RateLimited(_))
    }

    /// Get retry-after duration if rate limited.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        if let Self::RateLimited(secs) = self {
            Some(std::time::Duration::from_secs(*secs))
        } else {
            None
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "web-push")]
impl From<web_push::WebPushError> for DeliveryError {
    fn from(err: web_push::WebPushError) -> Self {
        // web_push error variants differ between releases; classify on the rendered message
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("not found") || lower.contains("gone") || lower.contains("not valid") {
            Self::Gone(message)
        } else if lower.contains("crypto") || lower.contains("uri") {
            Self::InvalidSubscription(message)
        } else if lower.contains("unauthorized") || lower.contains("claims") {
            Self::Auth(message)
        } else if lower.contains("too large") {
            Self::PayloadTooLarge {
                size: 0,
                limit: crate::MAX_PAYLOAD_SIZE,
            }
        } else if lower.contains("429") || lower.contains("rate") {
            Self::RateLimited(60)
        } else {
            Self::Provider(message)
        }
    }
}
