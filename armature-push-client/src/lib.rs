//! # Armature Push Client
//!
//! The client half of Web Push: negotiates notification permission,
//! registers the service worker, and creates or revokes the push
//! subscription, exposing every step as observable state.
//!
//! ## Features
//!
//! - **State machine**: `subscribe`, `unsubscribe`, `toggle`, `reset`, `check`
//! - **Observable state**: a `tokio::sync::watch` channel any UI layer can bind to
//! - **Retries**: registration and subscription calls retried with a fixed delay
//! - **Key resolution**: VAPID key from config, injected slots or the environment
//! - **Auto-subscribe**: subscribes as soon as permission is granted
//! - **Injected platform**: browser facilities behind traits, with an
//!   in-memory implementation for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_push_client::{MemoryPlatform, PushClient, PushConfig, Progress};
//!
//! # tokio_test::block_on(async {
//! let platform = MemoryPlatform::granted();
//! let config = PushConfig::new().vapid_public_key(
//!     "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U",
//! );
//!
//! let client = PushClient::new(config, platform.platform());
//! let subscription = client.subscribe().await?;
//!
//! assert!(client.is_subscribed());
//! assert_eq!(client.state().progress, Progress::Ready);
//! # let _ = subscription;
//! # Ok::<(), armature_push_client::PushError>(())
//! # }).unwrap();
//! ```
//!
//! ## Auto-subscribe
//!
//! ```rust,ignore
//! let client = PushClient::new(PushConfig::new().auto_subscribe(true), platform);
//! let _watcher = client.start(); // keep alive for the lifetime of the page
//! ```

mod client;
mod config;
mod error;
mod key;
mod logger;
mod memory;
mod platform;
mod registrar;
mod retry;
mod state;
mod watcher;

pub use armature_push::{Subscription, SubscriptionKeys};
pub use client::{PushClient, ToggleOutcome};
pub use config::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, DEFAULT_SERVICE_WORKER_URL, PushConfig};
pub use error::{PlatformError, PushError, PushErrorKind, Result};
pub use key::{
    ConfigKey, EnvKey, GLOBAL_KEY_SLOT, INJECTED_KEY_SLOT, InjectedKey, KeyRegistry,
    KeyResolver, KeySource, PUBLIC_KEY_ENV, decode_application_server_key,
    encode_application_server_key,
};
pub use logger::{LogLevel, PushLogger};
pub use memory::{CallCounts, MemoryPlatform};
pub use platform::{
    NotificationPermissions, PermissionState, Platform, PlatformResult, PushManager,
    Registration, ServiceWorkerContainer, SubscribeOptions,
};
pub use registrar::ServiceWorkerRegistrar;
pub use retry::{RetryExecutor, RetryPolicy};
pub use state::{Progress, PushState};
pub use watcher::PermissionWatcher;

/// Prelude for common imports.
///
/// ```
/// use armature_push_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{PushClient, ToggleOutcome};
    pub use crate::config::PushConfig;
    pub use crate::error::{PlatformError, PushError, PushErrorKind, Result};
    pub use crate::platform::{PermissionState, Platform};
    pub use crate::state::{Progress, PushState};
    pub use crate::watcher::PermissionWatcher;
    pub use armature_push::Subscription;
}
