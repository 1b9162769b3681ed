//! Integration tests for armature-push

use armature_push::*;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Sender that fails for endpoints containing "gone" and records the rest.
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, serde_json::Value)>>,
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<()> {
        if subscription.endpoint.contains("gone") {
            return Err(DeliveryError::Gone("410 Gone".to_string()));
        }
        if subscription.endpoint.contains("flaky") {
            return Err(DeliveryError::Provider("503 Service Unavailable".to_string()));
        }

        let json = serde_json::from_slice(payload)?;
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), json));
        Ok(())
    }
}

fn subscription(endpoint: &str) -> Subscription {
    Subscription::new(endpoint, "BNcRdreALRFX", "tBHItJI5svbpez7KI4CCXg")
}

#[tokio::test]
async fn test_send_notification_success() {
    let sender = Arc::new(RecordingSender::default());
    let push = ServerPush::new(sender.clone());

    let payload = NotificationPayload::new("Hello", "World").url("https://example.com");
    let outcome = push
        .send_notification(&subscription("https://push.example.com/a"), &payload)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.error, None);

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1["title"], "Hello");
    assert_eq!(sent[0].1["message"], "World");
    assert_eq!(sent[0].1["url"], "https://example.com");
}

#[tokio::test]
async fn test_send_notification_failure_does_not_throw() {
    let push = ServerPush::new(RecordingSender::default());

    let outcome = push
        .send_notification(
            &subscription("https://push.example.com/gone"),
            &NotificationPayload::new("t", "m"),
        )
        .await;

    assert!(!outcome.success);
    assert!(outcome.remove);
    assert!(outcome.error.unwrap().contains("410"));
}

#[tokio::test]
async fn test_arbitrary_json_payload() {
    let sender = Arc::new(RecordingSender::default());
    let push = ServerPush::new(sender.clone());

    let payload = serde_json::json!({ "title": "Custom", "message": "m", "badge": 3 });
    let outcome = push
        .send_notification(&subscription("https://push.example.com/a"), &payload)
        .await;

    assert!(outcome.success);
    assert_eq!(sender.sent.lock().unwrap()[0].1["badge"], 3);
}

#[tokio::test]
async fn test_send_to_all_counts() {
    let sender = Arc::new(RecordingSender::default());
    let push = ServerPush::new(sender.clone());

    let subscriptions = vec![
        subscription("https://push.example.com/a"),
        subscription("https://push.example.com/gone"),
        subscription("https://push.example.com/b"),
        subscription("https://push.example.com/flaky"),
    ];

    let bulk = push
        .send_notification_to_all(&subscriptions, &NotificationPayload::new("t", "m"))
        .await;

    assert_eq!(bulk.successful, 2);
    assert_eq!(bulk.failed, 2);
    assert_eq!(bulk.results.len(), 4);
    assert_eq!(bulk.results[1].endpoint, "https://push.example.com/gone");
    assert_eq!(
        bulk.stale_endpoints().collect::<Vec<_>>(),
        vec!["https://push.example.com/gone"]
    );
    assert_eq!(sender.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_send_to_all_oversized_payload() {
    let sender = Arc::new(RecordingSender::default());
    let push = ServerPush::new(sender.clone());

    let subscriptions = vec![
        subscription("https://push.example.com/a"),
        subscription("https://push.example.com/b"),
    ];
    let payload = NotificationPayload::new("t", "x".repeat(MAX_PAYLOAD_SIZE + 1));

    let bulk = push.send_notification_to_all(&subscriptions, &payload).await;

    assert_eq!(bulk.successful, 0);
    assert_eq!(bulk.failed, 2);
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_to_all_empty() {
    let push = ServerPush::new(RecordingSender::default());
    let bulk = push
        .send_notification_to_all(&[], &NotificationPayload::new("t", "m"))
        .await;

    assert_eq!(bulk, BulkDelivery::default());
}

#[test]
fn test_outcome_serialization() {
    let outcome = DeliveryOutcome {
        endpoint: "https://push.example.com/a".to_string(),
        success: true,
        error: None,
        remove: false,
    };

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "endpoint": "https://push.example.com/a", "success": true })
    );
}
