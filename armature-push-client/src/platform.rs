//! Browser platform collaborators.
//!
//! The push client never touches ambient globals. Everything it needs from
//! the runtime (service worker container, push manager, notification
//! permissions) is injected through these traits, so the same state machine
//! runs against `wasm-bindgen` bindings in a browser or
//! [`MemoryPlatform`](crate::MemoryPlatform) in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{PlatformError, Subscription};

/// Result type for platform calls.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// The user has not decided yet; a prompt may be shown.
    #[default]
    Default,
    /// Notifications are allowed.
    Granted,
    /// Notifications are blocked; prompts are suppressed.
    Denied,
}

impl PermissionState {
    /// Lowercase platform name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
        }
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for `PushManager.subscribe()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Every push must show a notification. Browsers require `true`.
    pub user_visible_only: bool,
    /// Raw VAPID public key bytes.
    pub application_server_key: Vec<u8>,
}

impl SubscribeOptions {
    /// Options for a user-visible subscription with the given key.
    pub fn user_visible(application_server_key: Vec<u8>) -> Self {
        Self {
            user_visible_only: true,
            application_server_key,
        }
    }
}

/// The push manager attached to a service worker registration.
#[async_trait]
pub trait PushManager: Send + Sync {
    /// The current subscription, if any.
    async fn get_subscription(&self) -> PlatformResult<Option<Subscription>>;

    /// Create (or return the existing) subscription.
    async fn subscribe(&self, options: SubscribeOptions) -> PlatformResult<Subscription>;

    /// Revoke a subscription. Returns whether anything was revoked.
    async fn unsubscribe(&self, subscription: &Subscription) -> PlatformResult<bool>;
}

/// A service worker registration.
#[derive(Clone)]
pub struct Registration {
    /// Registration scope URL.
    pub scope: String,
    /// Whether the worker has reached the `activated` state.
    pub active: bool,
    push_manager: Arc<dyn PushManager>,
}

impl Registration {
    /// Create a registration handle.
    pub fn new(scope: impl Into<String>, active: bool, push_manager: Arc<dyn PushManager>) -> Self {
        Self {
            scope: scope.into(),
            active,
            push_manager,
        }
    }

    /// The registration's push manager.
    pub fn push_manager(&self) -> &dyn PushManager {
        self.push_manager.as_ref()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("scope", &self.scope)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// `navigator.serviceWorker`.
#[async_trait]
pub trait ServiceWorkerContainer: Send + Sync {
    /// Register the worker script. Re-registering the same script returns
    /// the existing registration.
    async fn register(&self, script_url: &str) -> PlatformResult<Registration>;

    /// Resolves once a registration has an active worker.
    async fn ready(&self) -> PlatformResult<Registration>;
}

/// `Notification.permission` and friends.
#[async_trait]
pub trait NotificationPermissions: Send + Sync {
    /// Current permission state.
    fn permission(&self) -> PermissionState;

    /// Show the permission prompt (or return the remembered answer).
    async fn request_permission(&self) -> PlatformResult<PermissionState>;

    /// Permission change events, when the platform exposes them.
    fn changes(&self) -> Option<broadcast::Receiver<PermissionState>> {
        None
    }
}

/// The platform facilities a push client runs against.
#[derive(Clone)]
pub struct Platform {
    service_worker: Option<Arc<dyn ServiceWorkerContainer>>,
    push_manager_available: bool,
    notifications: Arc<dyn NotificationPermissions>,
}

impl Platform {
    /// A platform with notification permissions but no push facilities yet.
    pub fn new(notifications: Arc<dyn NotificationPermissions>) -> Self {
        Self {
            service_worker: None,
            push_manager_available: false,
            notifications,
        }
    }

    /// Attach a service worker container.
    pub fn with_service_worker(mut self, container: Arc<dyn ServiceWorkerContainer>) -> Self {
        self.service_worker = Some(container);
        self
    }

    /// Declare whether the runtime exposes `PushManager`.
    pub fn with_push_manager(mut self, available: bool) -> Self {
        self.push_manager_available = available;
        self
    }

    /// True iff both a service worker facility and a push manager exist.
    pub fn supports_push(&self) -> bool {
        self.service_worker.is_some() && self.push_manager_available
    }

    /// The service worker container, if present.
    pub fn service_worker(&self) -> Option<&Arc<dyn ServiceWorkerContainer>> {
        self.service_worker.as_ref()
    }

    /// Notification permission facility.
    pub fn notifications(&self) -> &Arc<dyn NotificationPermissions> {
        &self.notifications
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("service_worker", &self.service_worker.is_some())
            .field("push_manager", &self.push_manager_available)
            .finish_non_exhaustive()
    }
}
