//! # Armature Push
//!
//! Server-side Web Push delivery and the subscription types shared with
//! `armature-push-client`.
//!
//! ## Features
//!
//! - **Subscriptions**: serde types matching the browser `PushSubscription` JSON
//! - **Delivery adapter**: per-subscription outcomes that never abort a broadcast
//! - **Bulk sends**: concurrent delivery with aggregate success/failure counts
//! - **Web Push**: VAPID-signed, aes128gcm-encrypted transport (`web-push` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use armature_push::{NotificationPayload, ServerPush, Subscription, VapidConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let push = ServerPush::web_push(VapidConfig::from_env()?)?;
//!
//!     let subscription: Subscription = serde_json::from_str(&stored_json)?;
//!     let payload = NotificationPayload::new("Hello!", "This is a push notification")
//!         .url("https://example.com/inbox");
//!
//!     let outcome = push.send_notification(&subscription, &payload).await;
//!     if outcome.remove {
//!         // drop the subscription from storage
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod delivery;
mod error;
mod payload;
mod sender;
mod subscription;

#[cfg(feature = "web-push")]
mod web_push;

pub use config::{PRIVATE_KEY_ENV, PUBLIC_KEY_ENV, SUBJECT_ENV, VapidConfig};
pub use delivery::{BulkDelivery, DeliveryOutcome, ServerPush};
pub use error::{DeliveryError, Result};
pub use payload::{MAX_PAYLOAD_SIZE, NotificationPayload};
pub use sender::PushSender;
pub use subscription::{Subscription, SubscriptionKeys};

#[cfg(feature = "web-push")]
pub use web_push::WebPushSender;

/// Prelude for common imports.
///
/// ```
/// use armature_push::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::VapidConfig;
    pub use crate::delivery::{BulkDelivery, DeliveryOutcome, ServerPush};
    pub use crate::error::{DeliveryError, Result};
    pub use crate::payload::NotificationPayload;
    pub use crate::sender::PushSender;
    pub use crate::subscription::{Subscription, SubscriptionKeys};

    #[cfg(feature = "web-push")]
    pub use crate::web_push::WebPushSender;
}
