//! Permission watching and auto-subscribe.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{PermissionState, PushClient, PushState};

/// The inputs the auto-subscribe effect reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Trigger {
    permission: PermissionState,
    subscribed: bool,
    loading: bool,
    errored: bool,
}

impl From<&PushState> for Trigger {
    fn from(state: &PushState) -> Self {
        Self {
            permission: state.permission,
            subscribed: state.subscribed(),
            loading: state.loading,
            errored: state.error.is_some(),
        }
    }
}

/// Background tasks that keep a [`PushClient`] in sync with the platform's
/// permission and, when configured, subscribe automatically.
///
/// Two tasks run:
///
/// - a listener for platform permission change events (when the platform
///   exposes them), updating the cached permission;
/// - an effect that re-evaluates auto-subscribe whenever the permission,
///   subscription or loading state changes, which also covers a permission
///   granted before the watcher started.
///
/// Auto-subscribe failures are logged and never reach a caller. Dropping the
/// watcher aborts both tasks.
#[must_use = "dropping the watcher stops it"]
pub struct PermissionWatcher {
    tasks: Vec<JoinHandle<()>>,
}

impl PermissionWatcher {
    /// Start watching on behalf of `client`.
    pub fn spawn(client: &PushClient) -> Self {
        let mut tasks = Vec::new();

        if !client.is_supported() {
            debug!("Push unsupported, permission watcher idle");
            return Self { tasks };
        }

        if let Some(mut changes) = client.platform().notifications().changes() {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    let permission = match changes.recv().await {
                        Ok(permission) => permission,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Permission events lagged, re-reading");
                            client.platform().notifications().permission()
                        }
                        Err(RecvError::Closed) => break,
                    };

                    debug!(%permission, "Notification permission changed");
                    client.set_permission(permission);
                    if permission == PermissionState::Granted {
                        client.try_auto_subscribe("Permission granted, auto-subscribing...");
                    }
                }
            }));
        }

        let client = client.clone();
        let mut state = client.watch();
        tasks.push(tokio::spawn(async move {
            client.check().await;

            let mut last = None;
            loop {
                let trigger = Trigger::from(&*state.borrow_and_update());
                if last != Some(trigger) {
                    last = Some(trigger);
                    client.try_auto_subscribe("Auto-subscribing...");
                }
                if state.changed().await.is_err() {
                    break;
                }
            }
        }));

        Self { tasks }
    }

    /// Whether every task has exited.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.is_finished())
    }

    /// Stop watching.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PermissionWatcher {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
