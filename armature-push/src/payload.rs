//! Notification payload types.

use serde::{Deserialize, Serialize};

/// Largest payload push services are required to accept, in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// The JSON body delivered to the service worker's `push` handler.
///
/// The worker reads `title` and `message` to build the notification and
/// opens `url` on click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// URL opened when the notification is clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Tag for notification grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl NotificationPayload {
    /// Create a new payload.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            url: None,
            icon: None,
            tag: None,
        }
    }

    /// Set the click-through URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the icon URL.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the tag for grouping.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Serialize any payload to the bytes sent over the wire.
pub(crate) fn encode_payload<P: Serialize + ?Sized>(payload: &P) -> crate::Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    if body.len() > MAX_PAYLOAD_SIZE {
        return Err(crate::DeliveryError::PayloadTooLarge {
            size: body.len(),
            limit: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(body)
}
