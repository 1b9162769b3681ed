//! VAPID server configuration.

use std::env;

use crate::{DeliveryError, Result};

/// Environment variable holding the VAPID public key.
pub const PUBLIC_KEY_ENV: &str = "NEXT_PUBLIC_VAPID_PUBLIC_KEY";
/// Environment variable holding the VAPID private key.
pub const PRIVATE_KEY_ENV: &str = "VAPID_PRIVATE_KEY";
/// Environment variable holding the contact address.
pub const SUBJECT_ENV: &str = "VAPID_SUBJECT";

const DEFAULT_SUBJECT: &str = "admin@example.com";

/// VAPID credentials used to sign deliveries.
#[derive(Debug, Clone)]
pub struct VapidConfig {
    /// Subject claim (`mailto:` or `https:` URL).
    pub subject: String,
    /// VAPID public key (base64 URL-safe encoded).
    pub public_key: String,
    /// VAPID private key (base64 URL-safe encoded).
    pub private_key: String,
    /// Default TTL in seconds.
    pub default_ttl: u32,
}

impl VapidConfig {
    /// Create a new configuration with the default subject.
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            subject: normalize_subject(DEFAULT_SUBJECT),
            public_key: public_key.into(),
            private_key: private_key.into(),
            default_ttl: 86400, // 24 hours
        }
    }

    /// Load keys (and optionally the subject) from the environment.
    pub fn from_env() -> Result<Self> {
        let public_key = env::var(PUBLIC_KEY_ENV)
            .map_err(|_| DeliveryError::Config(format!("{} is not set", PUBLIC_KEY_ENV)))?;
        let private_key = env::var(PRIVATE_KEY_ENV)
            .map_err(|_| DeliveryError::Config(format!("{} is not set", PRIVATE_KEY_ENV)))?;

        let mut config = Self::new(public_key, private_key);
        if let Ok(subject) = env::var(SUBJECT_ENV) {
            config = config.subject(subject);
        }
        config.validate()?;
        Ok(config)
    }

    /// Set the subject. Bare e-mail addresses get a `mailto:` prefix.
    pub fn subject(mut self, subject: impl AsRef<str>) -> Self {
        self.subject = normalize_subject(subject.as_ref());
        self
    }

    /// Set the default TTL.
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Check that both keys are present.
    pub fn validate(&self) -> Result<()> {
        if self.public_key.trim().is_empty() {
            return Err(DeliveryError::Config("VAPID public key is empty".to_string()));
        }
        if self.private_key.trim().is_empty() {
            return Err(DeliveryError::Config("VAPID private key is empty".to_string()));
        }
        Ok(())
    }
}

fn normalize_subject(subject: &str) -> String {
    if subject.starts_with("mailto:") || subject.starts_with("https:") {
        subject.to_string()
    } else {
        format!("mailto:{}", subject)
    }
}
