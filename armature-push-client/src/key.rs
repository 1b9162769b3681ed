//! VAPID public key resolution and encoding.
//!
//! Keys are looked up lazily, at subscribe time, from an ordered list of
//! [`KeySource`]s. The first source that yields a non-empty value wins.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{PushError, PushErrorKind, Result};

/// Registry slot checked right after the explicit config value.
pub const INJECTED_KEY_SLOT: &str = "__NEXT_PUSH_VAPID_PUBLIC_KEY__";
/// Environment variable checked third.
pub const PUBLIC_KEY_ENV: &str = armature_push::PUBLIC_KEY_ENV;
/// Registry slot checked last.
pub const GLOBAL_KEY_SLOT: &str = "NEXT_PUSH_VAPID_PUBLIC_KEY";

/// A place a VAPID public key may come from.
pub trait KeySource: Send + Sync {
    /// Where this source looks, for error messages.
    fn describe(&self) -> String;

    /// The key, if this source currently has one.
    fn lookup(&self) -> Option<String>;
}

/// The key given explicitly in [`PushConfig`](crate::PushConfig).
#[derive(Debug, Clone)]
pub struct ConfigKey(pub Option<String>);

impl KeySource for ConfigKey {
    fn describe(&self) -> String {
        "config".to_string()
    }

    fn lookup(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A process environment variable, read on every lookup.
#[derive(Debug, Clone)]
pub struct EnvKey {
    var: String,
}

impl EnvKey {
    /// Read the key from `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl KeySource for EnvKey {
    fn describe(&self) -> String {
        format!("environment variable {}", self.var)
    }

    fn lookup(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// Named values injected by the embedding application.
///
/// Shared handle; values set after the client is built are seen by the next
/// subscribe.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    slots: Arc<RwLock<HashMap<String, String>>>,
}

impl KeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a slot.
    pub fn set(&self, slot: impl Into<String>, value: impl Into<String>) {
        self.slots.write().insert(slot.into(), value.into());
    }

    /// Read a slot.
    pub fn get(&self, slot: &str) -> Option<String> {
        self.slots.read().get(slot).cloned()
    }

    /// Clear a slot.
    pub fn remove(&self, slot: &str) -> Option<String> {
        self.slots.write().remove(slot)
    }
}

/// One slot of a [`KeyRegistry`].
#[derive(Debug, Clone)]
pub struct InjectedKey {
    registry: KeyRegistry,
    slot: String,
}

impl InjectedKey {
    /// Read the key from `slot` of `registry`.
    pub fn new(registry: KeyRegistry, slot: impl Into<String>) -> Self {
        Self {
            registry,
            slot: slot.into(),
        }
    }
}

impl KeySource for InjectedKey {
    fn describe(&self) -> String {
        format!("registry slot {}", self.slot)
    }

    fn lookup(&self) -> Option<String> {
        self.registry.get(&self.slot)
    }
}

/// Resolves the VAPID public key from a priority-ordered list of sources.
pub struct KeyResolver {
    sources: Vec<Box<dyn KeySource>>,
}

impl KeyResolver {
    /// A resolver with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// The standard chain: config value, injected slot, environment, global slot.
    pub fn standard(config_key: Option<String>, registry: KeyRegistry) -> Self {
        Self::new()
            .source(ConfigKey(config_key))
            .source(InjectedKey::new(registry.clone(), INJECTED_KEY_SLOT))
            .source(EnvKey::new(PUBLIC_KEY_ENV))
            .source(InjectedKey::new(registry, GLOBAL_KEY_SLOT))
    }

    /// Append a source with lower priority than those already added.
    pub fn source(mut self, source: impl KeySource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// First non-empty key, or `VAPID_MISSING`.
    pub fn resolve(&self) -> Result<String> {
        self.sources
            .iter()
            .filter_map(|s| s.lookup())
            .map(|k| k.trim().to_string())
            .find(|k| !k.is_empty())
            .ok_or_else(|| {
                let places: Vec<String> = self.sources.iter().map(|s| s.describe()).collect();
                PushError::new(
                    PushErrorKind::VapidMissing,
                    format!(
                        "VAPID public key is required. Provide it via: {}",
                        places.join(", ")
                    ),
                )
            })
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a URL-safe base64 key (padding optional) into raw bytes.
pub fn decode_application_server_key(key: &str) -> Result<Vec<u8>> {
    let key = key.trim();
    let padding = (4 - key.len() % 4) % 4;
    let standard: String = key
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .chain(std::iter::repeat_n('=', padding))
        .collect();

    STANDARD.decode(standard).map_err(|e| {
        PushError::new(
            PushErrorKind::SubscriptionFailed,
            format!("Invalid VAPID public key: {}", e),
        )
    })
}

/// Encode raw key bytes as unpadded URL-safe base64.
pub fn encode_application_server_key(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
