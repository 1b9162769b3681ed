//! In-memory platform.
//!
//! Behaves like a browser that already has the worker script available:
//! registration is idempotent, subscriptions persist until revoked, and the
//! permission prompt answers with a scripted value. Every call is counted and
//! failures can be scripted per facility, which makes it the backbone of the
//! crate's tests and usable for headless embedding.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::platform::{
    NotificationPermissions, Platform, PlatformResult, PushManager, Registration,
    ServiceWorkerContainer, SubscribeOptions,
};
use crate::{PermissionState, PlatformError, Subscription};

/// Number of calls made into each facility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `serviceWorker.register()`.
    pub register: u32,
    /// Registrations that actually installed a worker.
    pub installs: u32,
    /// `serviceWorker.ready`.
    pub ready: u32,
    /// `Notification.requestPermission()`.
    pub request_permission: u32,
    /// `pushManager.getSubscription()`.
    pub get_subscription: u32,
    /// `pushManager.subscribe()`.
    pub subscribe: u32,
    /// `subscription.unsubscribe()`.
    pub unsubscribe: u32,
}

#[derive(Debug, Default)]
struct Failures {
    register: u32,
    ready: u32,
    request_permission: u32,
    get_subscription: u32,
    subscribe: u32,
    unsubscribe: u32,
}

fn take_failure(counter: &mut u32, what: &str) -> PlatformResult<()> {
    if *counter > 0 {
        *counter -= 1;
        Err(PlatformError::named(
            "AbortError",
            format!("{} failed", what),
        ))
    } else {
        Ok(())
    }
}

#[derive(Debug)]
struct State {
    permission: PermissionState,
    prompt_answer: PermissionState,
    installed: bool,
    subscription: Option<Subscription>,
    last_key: Option<Vec<u8>>,
    issued: u32,
    calls: CallCounts,
    failures: Failures,
}

struct Inner {
    state: Mutex<State>,
    changes: Option<broadcast::Sender<PermissionState>>,
    prompt_delay: Mutex<Duration>,
}

/// A scriptable, in-memory browser platform.
#[derive(Clone)]
pub struct MemoryPlatform {
    inner: Arc<Inner>,
}

impl MemoryPlatform {
    /// A platform whose permission starts at `permission`. Prompts answer
    /// `prompt_answer`. Permission change events are available.
    pub fn new(permission: PermissionState, prompt_answer: PermissionState) -> Self {
        Self::build(permission, prompt_answer, true)
    }

    /// Like [`new`](Self::new) but without permission change events.
    pub fn without_change_events(permission: PermissionState, prompt_answer: PermissionState) -> Self {
        Self::build(permission, prompt_answer, false)
    }

    fn build(permission: PermissionState, prompt_answer: PermissionState, events: bool) -> Self {
        let changes = events.then(|| broadcast::channel(16).0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    permission,
                    prompt_answer,
                    installed: false,
                    subscription: None,
                    last_key: None,
                    issued: 0,
                    calls: CallCounts::default(),
                    failures: Failures::default(),
                }),
                changes,
                prompt_delay: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Permission already granted.
    pub fn granted() -> Self {
        Self::new(PermissionState::Granted, PermissionState::Granted)
    }

    /// Permission already denied.
    pub fn denied() -> Self {
        Self::new(PermissionState::Denied, PermissionState::Denied)
    }

    /// Permission undecided; the prompt will answer `answer`.
    pub fn prompting(answer: PermissionState) -> Self {
        Self::new(PermissionState::Default, answer)
    }

    /// A fully supported [`Platform`] backed by this instance.
    pub fn platform(&self) -> Platform {
        Platform::new(Arc::new(self.clone()))
            .with_service_worker(self.container())
            .with_push_manager(true)
    }

    /// A [`Platform`] without service worker or push support.
    pub fn unsupported(&self) -> Platform {
        Platform::new(Arc::new(self.clone()))
    }

    /// This instance as a service worker container.
    pub fn container(&self) -> Arc<dyn ServiceWorkerContainer> {
        Arc::new(self.clone())
    }

    /// Calls made so far.
    pub fn calls(&self) -> CallCounts {
        self.inner.state.lock().calls
    }

    /// The subscription the push service currently holds.
    pub fn current_subscription(&self) -> Option<Subscription> {
        self.inner.state.lock().subscription.clone()
    }

    /// Install a subscription as if created in an earlier session.
    pub fn seed_subscription(&self, subscription: Subscription) {
        let mut state = self.inner.state.lock();
        state.installed = true;
        state.subscription = Some(subscription);
    }

    /// Key bytes passed to the last `subscribe()`.
    pub fn last_application_server_key(&self) -> Option<Vec<u8>> {
        self.inner.state.lock().last_key.clone()
    }

    /// Change the permission, as the user would in browser settings, and
    /// emit a change event.
    pub fn set_permission(&self, permission: PermissionState) {
        self.inner.state.lock().permission = permission;
        if let Some(tx) = &self.inner.changes {
            let _ = tx.send(permission);
        }
    }

    /// Change what the next prompt answers.
    pub fn set_prompt_answer(&self, answer: PermissionState) {
        self.inner.state.lock().prompt_answer = answer;
    }

    /// Keep the permission prompt open for `delay`.
    pub fn set_prompt_delay(&self, delay: Duration) {
        *self.inner.prompt_delay.lock() = delay;
    }

    /// Fail the next `n` registrations.
    pub fn fail_register(&self, n: u32) {
        self.inner.state.lock().failures.register = n;
    }

    /// Fail the next `n` readiness waits.
    pub fn fail_ready(&self, n: u32) {
        self.inner.state.lock().failures.ready = n;
    }

    /// Fail the next `n` permission requests.
    pub fn fail_request_permission(&self, n: u32) {
        self.inner.state.lock().failures.request_permission = n;
    }

    /// Fail the next `n` subscription lookups.
    pub fn fail_get_subscription(&self, n: u32) {
        self.inner.state.lock().failures.get_subscription = n;
    }

    /// Fail the next `n` subscribe calls.
    pub fn fail_subscribe(&self, n: u32) {
        self.inner.state.lock().failures.subscribe = n;
    }

    /// Fail the next `n` unsubscribe calls.
    pub fn fail_unsubscribe(&self, n: u32) {
        self.inner.state.lock().failures.unsubscribe = n;
    }

    fn registration(&self, active: bool) -> Registration {
        Registration::new("/", active, Arc::new(self.clone()))
    }
}

#[async_trait]
impl ServiceWorkerContainer for MemoryPlatform {
    async fn register(&self, _script_url: &str) -> PlatformResult<Registration> {
        let active = {
            let mut state = self.inner.state.lock();
            state.calls.register += 1;
            take_failure(&mut state.failures.register, "register")?;

            let active = state.installed;
            if !state.installed {
                state.installed = true;
                state.calls.installs += 1;
            }
            active
        };
        Ok(self.registration(active))
    }

    async fn ready(&self) -> PlatformResult<Registration> {
        {
            let mut state = self.inner.state.lock();
            state.calls.ready += 1;
            take_failure(&mut state.failures.ready, "ready")?;
            if !state.installed {
                return Err(PlatformError::named(
                    "InvalidStateError",
                    "no service worker registered",
                ));
            }
        }
        Ok(self.registration(true))
    }
}

#[async_trait]
impl PushManager for MemoryPlatform {
    async fn get_subscription(&self) -> PlatformResult<Option<Subscription>> {
        let mut state = self.inner.state.lock();
        state.calls.get_subscription += 1;
        take_failure(&mut state.failures.get_subscription, "getSubscription")?;
        Ok(state.subscription.clone())
    }

    async fn subscribe(&self, options: SubscribeOptions) -> PlatformResult<Subscription> {
        let mut state = self.inner.state.lock();
        state.calls.subscribe += 1;
        take_failure(&mut state.failures.subscribe, "subscribe")?;

        if state.permission != PermissionState::Granted {
            return Err(PlatformError::named(
                "NotAllowedError",
                "permission not granted",
            ));
        }
        if !options.user_visible_only {
            return Err(PlatformError::named(
                "NotSupportedError",
                "userVisibleOnly must be true",
            ));
        }

        state.last_key = Some(options.application_server_key);
        if let Some(existing) = &state.subscription {
            return Ok(existing.clone());
        }

        state.issued += 1;
        let subscription = Subscription::new(
            format!("https://push.example.com/send/{}", state.issued),
            format!("p256dh-{}", state.issued),
            format!("auth-{}", state.issued),
        );
        state.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> PlatformResult<bool> {
        let mut state = self.inner.state.lock();
        state.calls.unsubscribe += 1;
        take_failure(&mut state.failures.unsubscribe, "unsubscribe")?;

        if state.subscription.as_ref() == Some(subscription) {
            state.subscription = None;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[async_trait]
impl NotificationPermissions for MemoryPlatform {
    fn permission(&self) -> PermissionState {
        self.inner.state.lock().permission
    }

    async fn request_permission(&self) -> PlatformResult<PermissionState> {
        let delay = *self.inner.prompt_delay.lock();
        {
            let mut state = self.inner.state.lock();
            state.calls.request_permission += 1;
            take_failure(&mut state.failures.request_permission, "requestPermission")?;
            if state.permission != PermissionState::Default {
                return Ok(state.permission);
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let answer = {
            let mut state = self.inner.state.lock();
            if state.permission == PermissionState::Default {
                state.permission = state.prompt_answer;
            }
            state.permission
        };

        if answer != PermissionState::Default {
            if let Some(tx) = &self.inner.changes {
                let _ = tx.send(answer);
            }
        }
        Ok(answer)
    }

    fn changes(&self) -> Option<broadcast::Receiver<PermissionState>> {
        self.inner.changes.as_ref().map(|tx| tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let platform = MemoryPlatform::granted();
        let options = SubscribeOptions::user_visible(vec![4, 1, 2]);

        let first = PushManager::subscribe(&platform, options.clone()).await.unwrap();
        let second = PushManager::subscribe(&platform, options).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(platform.last_application_server_key(), Some(vec![4, 1, 2]));
    }

    #[tokio::test]
    async fn test_prompt_answers_once() {
        let platform = MemoryPlatform::prompting(PermissionState::Denied);
        let mut events = platform.changes().unwrap();

        assert_eq!(platform.request_permission().await.unwrap(), PermissionState::Denied);
        assert_eq!(events.recv().await.unwrap(), PermissionState::Denied);

        platform.set_prompt_answer(PermissionState::Granted);
        // decision is remembered
        assert_eq!(platform.request_permission().await.unwrap(), PermissionState::Denied);
    }

    #[tokio::test]
    async fn test_scripted_failures_run_out() {
        let platform = MemoryPlatform::granted();
        platform.fail_get_subscription(1);

        assert!(platform.get_subscription().await.is_err());
        assert_eq!(platform.get_subscription().await.unwrap(), None);
        assert_eq!(platform.calls().get_subscription, 2);
    }

    #[test]
    fn test_supported_flags() {
        let platform = MemoryPlatform::granted();
        assert!(platform.platform().supports_push());
        assert!(!platform.unsupported().supports_push());
    }
}
