//! The subscription state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::key::{KeyRegistry, KeyResolver, decode_application_server_key};
use crate::logger::Logger;
use crate::platform::{Platform, SubscribeOptions};
use crate::registrar::ServiceWorkerRegistrar;
use crate::retry::RetryExecutor;
use crate::watcher::PermissionWatcher;
use crate::{
    PermissionState, Progress, PushConfig, PushError, PushErrorKind, PushState, Result,
    Subscription,
};

/// What [`PushClient::toggle`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A subscription was created (or returned by the platform).
    Subscribed(Subscription),
    /// The client unsubscribed; carries the revoked subscription, if any.
    Unsubscribed(Option<Subscription>),
}

/// Owns the push subscription lifecycle for one page or app instance.
///
/// Cloning is cheap and clones share state. Observers bind to
/// [`watch`](Self::watch); every transition is published there.
///
/// `subscribe` and `unsubscribe` are serialized per instance: a second call
/// waits for the first to finish. `check` and `get_subscription` only read
/// platform state and never wait.
#[derive(Clone)]
pub struct PushClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: PushConfig,
    platform: Platform,
    registrar: Option<ServiceWorkerRegistrar>,
    keys: KeyResolver,
    retry: RetryExecutor,
    logger: Logger,
    state: watch::Sender<PushState>,
    op_lock: Arc<Mutex<()>>,
    // bumped whenever an operation starts or finishes
    generation: AtomicU64,
    // set by a failed auto-subscribe, cleared by a grant or reset
    auto_parked: AtomicBool,
}

/// Clears `loading` when the operation ends, however it ends.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<PushState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.loading = false);
    }
}

impl PushClient {
    /// Create a client using the standard key sources and an empty registry.
    pub fn new(config: PushConfig, platform: Platform) -> Self {
        Self::with_key_registry(config, platform, KeyRegistry::new())
    }

    /// Create a client whose injected key slots live in `registry`.
    pub fn with_key_registry(config: PushConfig, platform: Platform, registry: KeyRegistry) -> Self {
        let keys = KeyResolver::standard(config.vapid_public_key.clone(), registry);
        Self::with_key_resolver(config, platform, keys)
    }

    /// Create a client with a custom key resolution chain.
    pub fn with_key_resolver(config: PushConfig, platform: Platform, keys: KeyResolver) -> Self {
        let logger = Logger::new(config.logger.clone());
        let supported = platform.supports_push();
        let permission = if supported {
            platform.notifications().permission()
        } else {
            PermissionState::Default
        };

        let registrar = platform.service_worker().map(|container| {
            ServiceWorkerRegistrar::new(container.clone(), config.service_worker_url.clone())
                .with_logger(logger.clone())
        });
        let retry = RetryExecutor::with_logger(config.retry_policy(), logger.clone());
        let (state, _) = watch::channel(PushState::new(supported, permission));

        debug!(supported, %permission, "Push client created");

        Self {
            inner: Arc::new(Inner {
                config,
                platform,
                registrar,
                keys,
                retry,
                logger,
                state,
                op_lock: Arc::new(Mutex::new(())),
                generation: AtomicU64::new(0),
                auto_parked: AtomicBool::new(false),
            }),
        }
    }

    /// Reconcile with the platform and start watching permission changes.
    ///
    /// Must be called inside a Tokio runtime. Dropping the returned watcher
    /// stops it.
    pub fn start(&self) -> PermissionWatcher {
        PermissionWatcher::spawn(self)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &PushConfig {
        &self.inner.config
    }

    /// The platform this client runs against.
    pub fn platform(&self) -> &Platform {
        &self.inner.platform
    }

    /// Current state snapshot.
    pub fn state(&self) -> PushState {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change.
    pub fn watch(&self) -> watch::Receiver<PushState> {
        self.inner.state.subscribe()
    }

    /// Whether push is supported on this platform.
    pub fn is_supported(&self) -> bool {
        self.inner.state.borrow().supported
    }

    /// Whether a subscription is cached.
    pub fn is_subscribed(&self) -> bool {
        self.inner.state.borrow().subscribed()
    }

    /// Whether an operation is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Re-read the subscription (and permission) from the platform.
    ///
    /// Failures are logged, not returned. Does not touch `progress`.
    pub async fn check(&self) {
        if !self.is_supported() {
            return;
        }

        self.set_permission(self.inner.platform.notifications().permission());
        if let Err(e) = self.reconcile(true).await {
            self.inner
                .logger
                .error(&format!("Subscription check error: {}", e));
        }
    }

    /// Re-read the subscription from the platform, cache it and return it.
    ///
    /// Also caches while an operation is in flight; the operation's own
    /// result replaces the value when it settles.
    pub async fn get_subscription(&self) -> Result<Option<Subscription>> {
        if !self.is_supported() {
            return Ok(None);
        }
        self.reconcile(false).await
    }

    /// Obtain permission if needed and subscribe.
    ///
    /// On failure the error is recorded in state (`progress = error`) and
    /// returned.
    pub async fn subscribe(&self) -> Result<Subscription> {
        if !self.is_supported() {
            return Err(PushError::not_supported());
        }

        let _op = self.inner.op_lock.lock().await;
        self.subscribe_locked().await
    }

    /// Revoke the current subscription, if any.
    ///
    /// Best effort: failures are recorded in state and logged, never
    /// returned.
    pub async fn unsubscribe(&self) -> Option<Subscription> {
        if !self.is_supported() {
            return None;
        }

        let _op = self.inner.op_lock.lock().await;
        self.unsubscribe_locked().await
    }

    /// Unsubscribe when subscribed, subscribe otherwise.
    pub async fn toggle(&self) -> Result<ToggleOutcome> {
        if self.is_subscribed() {
            Ok(ToggleOutcome::Unsubscribed(self.unsubscribe().await))
        } else {
            self.subscribe().await.map(ToggleOutcome::Subscribed)
        }
    }

    /// Unsubscribe if subscribed, then clear the error and return to idle.
    pub async fn reset(&self) {
        if self.is_subscribed() {
            self.unsubscribe().await;
        }
        self.inner.auto_parked.store(false, Ordering::SeqCst);
        self.update(|s| {
            s.error = None;
            s.progress = Progress::Idle;
        });
    }

    /// Record the platform permission. A change to granted re-arms
    /// auto-subscribe after an earlier failed attempt.
    pub(crate) fn set_permission(&self, permission: PermissionState) {
        self.inner.state.send_if_modified(|s| {
            if s.permission == permission {
                false
            } else {
                if permission == PermissionState::Granted {
                    self.inner.auto_parked.store(false, Ordering::SeqCst);
                }
                s.permission = permission;
                true
            }
        });
    }

    /// Spawn a subscribe if auto-subscribe is on and the guard holds.
    ///
    /// Takes the operation lock before spawning, so concurrent triggers
    /// start at most one attempt. After a failed attempt nothing is spawned
    /// until the permission is granted again or the client is reset.
    pub(crate) fn try_auto_subscribe(&self, reason: &str) -> bool {
        if !self.auto_subscribe_armed() {
            return false;
        }

        let Ok(op) = self.inner.op_lock.clone().try_lock_owned() else {
            return false;
        };
        if !self.auto_subscribe_armed() {
            return false;
        }

        self.inner.logger.info(reason);
        let client = self.clone();
        tokio::spawn(async move {
            let _op = op;
            if let Err(e) = client.subscribe_locked().await {
                // parked while the lock is still held
                client.inner.auto_parked.store(true, Ordering::SeqCst);
                client
                    .inner
                    .logger
                    .error(&format!("Auto-subscribe failed: {}", e));
            }
        });
        true
    }

    fn auto_subscribe_armed(&self) -> bool {
        self.inner.config.auto_subscribe
            && !self.inner.auto_parked.load(Ordering::SeqCst)
            && self.inner.state.borrow().can_auto_subscribe()
    }

    fn update(&self, modify: impl FnOnce(&mut PushState)) {
        self.inner.state.send_modify(modify);
    }

    /// Update state and mark that an operation started or settled.
    fn transition(&self, modify: impl FnOnce(&mut PushState)) {
        self.inner.state.send_modify(|s| {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            modify(s);
        });
    }

    fn begin(&self, progress: Progress) -> LoadingGuard<'_> {
        self.transition(|s| {
            s.loading = true;
            s.progress = progress;
        });
        LoadingGuard {
            state: &self.inner.state,
        }
    }

    fn fail(&self, context: &str, error: PushError) {
        self.inner
            .logger
            .error(&format!("{} ({}): {}", context, error.kind, error));
        self.transition(|s| {
            s.progress = Progress::Error;
            s.error = Some(error);
        });
    }

    fn registrar(&self) -> Result<&ServiceWorkerRegistrar> {
        self.inner
            .registrar
            .as_ref()
            .ok_or_else(PushError::not_supported)
    }

    /// Read the platform subscription into the cache.
    ///
    /// The read is discarded if an operation started or finished meanwhile,
    /// so a slow check never overwrites a fresher subscribe/unsubscribe.
    async fn reconcile(&self, wait_ready: bool) -> Result<Option<Subscription>> {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let registrar = self.registrar()?;
        let registration = if wait_ready {
            registrar.register_and_wait().await?
        } else {
            registrar.register().await?
        };

        let current = registration
            .push_manager()
            .get_subscription()
            .await
            .map_err(|e| PushError::platform(PushErrorKind::UnknownError, e))?;

        self.inner.state.send_if_modified(|s| {
            let stale = self.inner.generation.load(Ordering::SeqCst) != generation;
            if stale || s.subscription == current {
                false
            } else {
                s.subscription = current.clone();
                true
            }
        });
        Ok(current)
    }

    async fn subscribe_locked(&self) -> Result<Subscription> {
        let _loading = self.begin(Progress::Checking);

        match self.run_subscribe().await {
            Ok(subscription) => {
                info!(endpoint = %subscription.endpoint, "Push subscription active");
                self.transition(|s| {
                    s.subscription = Some(subscription.clone());
                    s.progress = Progress::Ready;
                    s.error = None;
                });
                Ok(subscription)
            }
            Err(e) => {
                self.fail("Subscribe error", e.clone());
                Err(e)
            }
        }
    }

    async fn run_subscribe(&self) -> Result<Subscription> {
        let notifications = self.inner.platform.notifications();

        let mut permission = notifications.permission();
        self.set_permission(permission);

        if permission == PermissionState::Denied {
            return Err(PushError::permission_denied());
        }

        if permission == PermissionState::Default {
            self.update(|s| s.progress = Progress::Requesting);
            // never retried: one prompt per user action
            permission = notifications
                .request_permission()
                .await
                .map_err(|e| PushError::platform(PushErrorKind::UnknownError, e))?;
            self.set_permission(permission);

            if permission != PermissionState::Granted {
                return Err(PushError::permission_not_granted());
            }
        }

        self.update(|s| s.progress = Progress::Subscribing);

        let key = self.inner.keys.resolve()?;
        let options = SubscribeOptions::user_visible(decode_application_server_key(&key)?);

        let registrar = self.registrar()?;
        let registration = self
            .inner
            .retry
            .retry(|| registrar.register_and_wait())
            .await?;

        let push_manager = registration.push_manager();
        self.inner
            .retry
            .retry(|| {
                let options = options.clone();
                async move {
                    push_manager
                        .subscribe(options)
                        .await
                        .map_err(|e| PushError::platform(PushErrorKind::SubscriptionFailed, e))
                }
            })
            .await
    }

    async fn unsubscribe_locked(&self) -> Option<Subscription> {
        let _loading = self.begin(Progress::Unsubscribing);

        match self.run_unsubscribe().await {
            Ok(revoked) => {
                self.transition(|s| {
                    s.subscription = None;
                    s.progress = Progress::Ready;
                    s.error = None;
                });
                revoked
            }
            Err(e) => {
                self.fail(
                    "Unsubscribe error",
                    e.into_kind(PushErrorKind::UnsubscriptionFailed),
                );
                None
            }
        }
    }

    async fn run_unsubscribe(&self) -> Result<Option<Subscription>> {
        // no readiness wait: an installing registration can still unsubscribe
        let registration = self.registrar()?.register().await?;
        let push_manager = registration.push_manager();

        let current = push_manager
            .get_subscription()
            .await
            .map_err(|e| PushError::platform(PushErrorKind::UnsubscriptionFailed, e))?;

        if let Some(subscription) = &current {
            let revoked = push_manager
                .unsubscribe(subscription)
                .await
                .map_err(|e| PushError::platform(PushErrorKind::UnsubscriptionFailed, e))?;
            debug!(endpoint = %subscription.endpoint, revoked, "Push subscription revoked");
        }

        Ok(current)
    }
}

impl std::fmt::Debug for PushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushClient")
            .field("config", &self.inner.config)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}
