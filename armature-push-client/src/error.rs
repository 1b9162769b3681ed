//! Push client error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for push client operations.
pub type Result<T> = std::result::Result<T, PushError>;

/// The closed set of failure kinds a push client can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushErrorKind {
    /// No VAPID public key could be resolved.
    VapidMissing,
    /// The runtime lacks service workers or a push manager.
    NotSupported,
    /// Permission was denied earlier; no prompt was shown.
    PermissionDenied,
    /// The user declined a fresh permission prompt.
    PermissionNotGranted,
    /// Service worker registration or activation failed.
    ServiceWorkerFailed,
    /// Creating the push subscription failed.
    SubscriptionFailed,
    /// Revoking the push subscription failed.
    UnsubscriptionFailed,
    /// Anything else.
    UnknownError,
}

impl PushErrorKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VapidMissing => "VAPID_MISSING",
            Self::NotSupported => "NOT_SUPPORTED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PermissionNotGranted => "PERMISSION_NOT_GRANTED",
            Self::ServiceWorkerFailed => "SERVICE_WORKER_FAILED",
            Self::SubscriptionFailed => "SUBSCRIPTION_FAILED",
            Self::UnsubscriptionFailed => "UNSUBSCRIPTION_FAILED",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for PushErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the browser platform (service worker container,
/// push manager or notification permissions).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlatformError {
    /// DOMException-style name, e.g. `NotAllowedError`.
    pub name: Option<String>,
    /// Human readable message.
    pub message: String,
}

impl PlatformError {
    /// Create an unnamed platform error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
        }
    }

    /// Create a named platform error.
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            message: message.into(),
        }
    }
}

/// Error surfaced by push client operations and recorded in [`PushState`](crate::PushState).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PushError {
    /// Failure kind.
    pub kind: PushErrorKind,
    /// Message of the original failure.
    pub message: String,
    #[source]
    cause: Option<Arc<PlatformError>>,
}

impl PushError {
    /// Create an error without an underlying cause.
    pub fn new(kind: PushErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap a platform failure, keeping its message.
    pub fn platform(kind: PushErrorKind, cause: PlatformError) -> Self {
        Self {
            kind,
            message: cause.message.clone(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// The platform failure behind this error, if any.
    pub fn cause(&self) -> Option<&PlatformError> {
        self.cause.as_deref()
    }

    /// Re-label the error while keeping message and cause.
    pub(crate) fn into_kind(mut self, kind: PushErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn not_supported() -> Self {
        Self::new(PushErrorKind::NotSupported, "Push notifications not supported")
    }

    pub(crate) fn permission_denied() -> Self {
        Self::new(
            PushErrorKind::PermissionDenied,
            "Notification permission denied",
        )
    }

    pub(crate) fn permission_not_granted() -> Self {
        Self::new(
            PushErrorKind::PermissionNotGranted,
            "Notification permission not granted",
        )
    }
}

impl PartialEq for PushError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.cause == other.cause
    }
}
