//! Push client configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::logger::PushLogger;
use crate::retry::RetryPolicy;

/// Default service worker script.
pub const DEFAULT_SERVICE_WORKER_URL: &str = "/sw.js";
/// Default number of attempts for retried platform calls.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Configuration for a [`PushClient`](crate::PushClient).
///
/// Read-only for the lifetime of the client it is passed to.
#[derive(Clone)]
pub struct PushConfig {
    /// Explicit VAPID public key. Takes precedence over every other key source.
    pub vapid_public_key: Option<String>,
    /// Service worker script URL.
    pub service_worker_url: String,
    /// Attempts for registration and subscription calls.
    pub retry_attempts: u32,
    /// Constant delay between attempts.
    pub retry_delay: Duration,
    /// Subscribe automatically once permission is granted.
    pub auto_subscribe: bool,
    /// Optional application log sink.
    pub logger: Option<Arc<dyn PushLogger>>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            service_worker_url: DEFAULT_SERVICE_WORKER_URL.to_string(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            auto_subscribe: false,
            logger: None,
        }
    }
}

impl PushConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the VAPID public key.
    pub fn vapid_public_key(mut self, key: impl Into<String>) -> Self {
        self.vapid_public_key = Some(key.into());
        self
    }

    /// Set the service worker script URL.
    pub fn service_worker_url(mut self, url: impl Into<String>) -> Self {
        self.service_worker_url = url.into();
        self
    }

    /// Set the retry attempts. Zero keeps the default.
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = if attempts == 0 {
            DEFAULT_RETRY_ATTEMPTS
        } else {
            attempts
        };
        self
    }

    /// Set the retry delay. Zero keeps the default.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = if delay.is_zero() {
            DEFAULT_RETRY_DELAY
        } else {
            delay
        };
        self
    }

    /// Enable or disable auto-subscribe.
    pub fn auto_subscribe(mut self, enabled: bool) -> Self {
        self.auto_subscribe = enabled;
        self
    }

    /// Set the log sink.
    pub fn logger(mut self, logger: impl PushLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Retry policy derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_delay)
    }
}

impl fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushConfig")
            .field("vapid_public_key", &self.vapid_public_key)
            .field("service_worker_url", &self.service_worker_url)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("auto_subscribe", &self.auto_subscribe)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;

    #[test]
    fn test_defaults() {
        let config = PushConfig::default();
        assert_eq!(config.service_worker_url, "/sw.js");
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(!config.auto_subscribe);
        assert!(config.vapid_public_key.is_none());
    }

    #[test]
    fn test_zero_values_fall_back_to_defaults() {
        let config = PushConfig::new()
            .retry_attempts(0)
            .retry_delay(Duration::ZERO);

        assert_eq!(config.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
        assert_eq!(config.retry_delay, DEFAULT_RETRY_DELAY);
    }

    #[test]
    fn test_builder() {
        let config = PushConfig::new()
            .vapid_public_key("BKey")
            .service_worker_url("/push-sw.js")
            .retry_attempts(5)
            .retry_delay(Duration::from_millis(250))
            .auto_subscribe(true)
            .logger(|_: &str, _: LogLevel| {});

        assert_eq!(config.vapid_public_key.as_deref(), Some("BKey"));
        assert_eq!(config.service_worker_url, "/push-sw.js");
        assert!(config.auto_subscribe);
        assert!(config.logger.is_some());

        let policy = config.retry_policy();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }
}
