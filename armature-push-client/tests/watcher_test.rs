//! Integration tests for permission watching and auto-subscribe

use armature_push_client::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const VAPID_KEY: &str =
    "BEl62iUYgUivxIkv69yViEuiBIa-Ib9-SkvMeAtA3LFgDzkrxZJjSgSnfckjBJuBkr3qBUYIHBQFLXYp5Nksh8U";

fn auto_config() -> PushConfig {
    PushConfig::new()
        .vapid_public_key(VAPID_KEY)
        .retry_delay(Duration::from_millis(5))
        .auto_subscribe(true)
}

async fn wait_until(client: &PushClient, predicate: impl FnMut(&PushState) -> bool) -> PushState {
    let mut states = client.watch();
    let state = tokio::time::timeout(Duration::from_secs(2), states.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed")
        .clone();
    state
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_auto_subscribes_when_already_granted() {
    let platform = MemoryPlatform::granted();
    let client = PushClient::new(auto_config(), platform.platform());

    let _watcher = client.start();
    let state = wait_until(&client, |s| s.subscribed()).await;

    assert_eq!(state.progress, Progress::Ready);
    assert_eq!(platform.calls().subscribe, 1);
    assert_eq!(platform.calls().request_permission, 0);
}

#[tokio::test]
async fn test_auto_subscribes_on_permission_change() {
    let platform = MemoryPlatform::prompting(PermissionState::Denied);
    let client = PushClient::new(auto_config(), platform.platform());
    let _watcher = client.start();
    settle().await;
    assert!(!client.is_subscribed());

    // granted from browser settings
    platform.set_permission(PermissionState::Granted);
    wait_until(&client, |s| s.subscribed()).await;

    assert_eq!(client.state().permission, PermissionState::Granted);
    assert_eq!(platform.calls().request_permission, 0);
}

#[tokio::test]
async fn test_no_auto_subscribe_when_disabled() {
    let platform = MemoryPlatform::granted();
    let client = PushClient::new(auto_config().auto_subscribe(false), platform.platform());

    let _watcher = client.start();
    settle().await;

    assert!(!client.is_subscribed());
    assert_eq!(platform.calls().subscribe, 0);
}

#[tokio::test]
async fn test_permission_changes_are_mirrored() {
    let platform = MemoryPlatform::prompting(PermissionState::Granted);
    let client = PushClient::new(auto_config(), platform.platform());
    let _watcher = client.start();

    platform.set_permission(PermissionState::Denied);
    let state = wait_until(&client, |s| s.permission == PermissionState::Denied).await;

    assert!(!state.subscribed());
    assert_eq!(platform.calls().subscribe, 0);
}

#[tokio::test]
async fn test_auto_subscribe_failure_is_logged_once() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = lines.clone();
    let platform = MemoryPlatform::granted();
    platform.fail_subscribe(100);
    let client = PushClient::new(
        auto_config()
            .retry_attempts(1)
            .logger(move |msg: &str, level: LogLevel| {
                captured.lock().push((level, msg.to_string()));
            }),
        platform.platform(),
    );

    let _watcher = client.start();
    let state = wait_until(&client, |s| s.progress == Progress::Error && !s.loading).await;
    settle().await;

    assert_eq!(state.error.map(|e| e.kind), Some(PushErrorKind::SubscriptionFailed));
    // parked in error: no retry loop
    assert_eq!(platform.calls().subscribe, 1);
    assert!(lines.lock().iter().any(|(level, msg)| {
        *level == LogLevel::Error && msg.starts_with("Auto-subscribe failed")
    }));
}

#[tokio::test]
async fn test_grant_after_declined_prompt_auto_subscribes() {
    let platform = MemoryPlatform::prompting(PermissionState::Denied);
    let client = PushClient::new(auto_config(), platform.platform());
    let _watcher = client.start();
    settle().await;

    let err = client.subscribe().await.unwrap_err();
    assert_eq!(err.kind, PushErrorKind::PermissionNotGranted);
    settle().await;
    assert_eq!(platform.calls().subscribe, 0);

    // later enabled from browser settings
    platform.set_permission(PermissionState::Granted);
    let state = wait_until(&client, |s| s.subscribed() && !s.loading).await;

    assert_eq!(state.progress, Progress::Ready);
    assert_eq!(state.error, None);
    assert_eq!(platform.calls().subscribe, 1);
    assert_eq!(platform.calls().request_permission, 1);
}

#[tokio::test]
async fn test_new_grant_rearms_failed_auto_subscribe() {
    let platform = MemoryPlatform::granted();
    platform.fail_subscribe(1);
    let client = PushClient::new(auto_config().retry_attempts(1), platform.platform());
    let _watcher = client.start();
    wait_until(&client, |s| s.progress == Progress::Error && !s.loading).await;
    settle().await;
    assert_eq!(platform.calls().subscribe, 1);

    platform.set_permission(PermissionState::Denied);
    wait_until(&client, |s| s.permission == PermissionState::Denied).await;
    platform.set_permission(PermissionState::Granted);
    wait_until(&client, |s| s.subscribed()).await;

    assert_eq!(platform.calls().subscribe, 2);
}

#[tokio::test]
async fn test_simultaneous_triggers_subscribe_once() {
    let platform = MemoryPlatform::new(PermissionState::Default, PermissionState::Granted);
    let client = PushClient::new(auto_config(), platform.platform());
    let _watcher = client.start();
    settle().await;

    // the event listener and the state effect both fire
    platform.set_permission(PermissionState::Granted);
    wait_until(&client, |s| s.subscribed() && !s.loading).await;
    settle().await;

    assert_eq!(platform.calls().subscribe, 1);
}

#[tokio::test]
async fn test_existing_subscription_is_reused() {
    let platform = MemoryPlatform::granted();
    let existing = Subscription::new("https://push.example.com/send/old", "p", "a");
    platform.seed_subscription(existing.clone());
    let client = PushClient::new(auto_config(), platform.platform());

    let _watcher = client.start();
    let state = wait_until(&client, |s| s.subscribed()).await;
    settle().await;

    assert_eq!(state.subscription, Some(existing));
    assert_eq!(platform.calls().subscribe, 0);
}

#[tokio::test]
async fn test_dropping_watcher_stops_it() {
    let platform = MemoryPlatform::new(PermissionState::Default, PermissionState::Granted);
    let client = PushClient::new(auto_config(), platform.platform());
    let watcher = client.start();
    settle().await;

    watcher.stop();
    platform.set_permission(PermissionState::Granted);
    settle().await;

    assert!(!client.is_subscribed());
    assert_eq!(client.state().permission, PermissionState::Default);
    assert_eq!(platform.calls().subscribe, 0);
}

#[tokio::test]
async fn test_without_change_events_check_picks_up_permission() {
    let platform =
        MemoryPlatform::without_change_events(PermissionState::Default, PermissionState::Granted);
    let client = PushClient::new(auto_config(), platform.platform());
    let _watcher = client.start();
    settle().await;

    platform.set_permission(PermissionState::Granted);
    settle().await;
    assert!(!client.is_subscribed());

    client.check().await;
    wait_until(&client, |s| s.subscribed()).await;
}

#[tokio::test]
async fn test_reset_retriggers_auto_subscribe() {
    let platform = MemoryPlatform::granted();
    platform.fail_subscribe(1);
    let client = PushClient::new(auto_config().retry_attempts(1), platform.platform());
    let _watcher = client.start();
    wait_until(&client, |s| s.progress == Progress::Error && !s.loading).await;

    client.reset().await;
    wait_until(&client, |s| s.subscribed()).await;

    assert_eq!(platform.calls().subscribe, 2);
}

#[tokio::test]
async fn test_unsupported_watcher_is_idle() {
    let platform = MemoryPlatform::granted();
    let client = PushClient::new(auto_config(), platform.unsupported());

    let watcher = client.start();
    assert!(watcher.is_finished());
    settle().await;
    assert_eq!(platform.calls(), CallCounts::default());
}
