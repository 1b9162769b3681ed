//! Observable push client state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{PermissionState, PushError, Subscription};

/// Phase of the subscribe/unsubscribe sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Progress {
    /// Nothing has happened yet, or the client was reset.
    #[default]
    Idle,
    /// Subscribe started; permission is being checked.
    Checking,
    /// Waiting on the permission prompt.
    Requesting,
    /// Registering the worker and creating the subscription.
    Subscribing,
    /// Revoking the subscription.
    Unsubscribing,
    /// Last operation completed.
    Ready,
    /// Last operation failed; see [`PushState::error`].
    Error,
}

impl Progress {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Requesting => "requesting",
            Self::Subscribing => "subscribing",
            Self::Unsubscribing => "unsubscribing",
            Self::Ready => "ready",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of everything a UI binds to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushState {
    /// Service workers and a push manager are both available.
    pub supported: bool,
    /// Last known notification permission.
    pub permission: PermissionState,
    /// A subscribe or unsubscribe is in flight.
    pub loading: bool,
    /// Current phase.
    pub progress: Progress,
    /// Error of the last failed operation.
    pub error: Option<PushError>,
    /// Cached copy of the platform's subscription. The push manager stays
    /// authoritative; `check()` reconciles the two.
    pub subscription: Option<Subscription>,
}

impl PushState {
    pub(crate) fn new(supported: bool, permission: PermissionState) -> Self {
        Self {
            supported,
            permission,
            ..Default::default()
        }
    }

    /// Whether a subscription is cached.
    pub fn subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Auto-subscribe guard: granted, not subscribed and not loading.
    pub(crate) fn can_auto_subscribe(&self) -> bool {
        self.supported
            && self.permission == PermissionState::Granted
            && !self.subscribed()
            && !self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribed_follows_cache() {
        let mut state = PushState::new(true, PermissionState::Granted);
        assert!(!state.subscribed());

        state.subscription = Some(Subscription::new("https://push.example.com/1", "p", "a"));
        assert!(state.subscribed());
    }

    #[test]
    fn test_auto_subscribe_guard() {
        let mut state = PushState::new(true, PermissionState::Granted);
        assert!(state.can_auto_subscribe());

        state.loading = true;
        assert!(!state.can_auto_subscribe());
        state.loading = false;

        // an earlier failure does not block a fresh attempt
        state.progress = Progress::Error;
        assert!(state.can_auto_subscribe());

        state.permission = PermissionState::Default;
        assert!(!state.can_auto_subscribe());

        assert!(!PushState::new(false, PermissionState::Granted).can_auto_subscribe());
    }

    #[test]
    fn test_progress_names() {
        assert_eq!(Progress::Unsubscribing.to_string(), "unsubscribing");
        assert_eq!(serde_json::to_string(&Progress::Ready).unwrap(), "\"ready\"");
    }
}
