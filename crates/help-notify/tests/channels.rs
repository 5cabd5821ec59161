//! Channel delivery against mock relay and push services.

use std::sync::Arc;
use std::time::Duration;

use help_alert::{AlertSnapshot, AlertStatus};
use help_notify::{
    Dispatcher, LogChannel, Notification, NotificationChannel, PushoverChannel, PushoverConfig,
    Subscription, SubscriptionKeys, SubscriptionStore, VapidConfig, VapidSigner, WebPushChannel,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &str = include_str!("fixtures/vapid_private.pem");
const PUBLIC_KEY: &str = include_str!("fixtures/vapid_public.txt");
const TIMEOUT: Duration = Duration::from_secs(5);

fn notification() -> Notification {
    Notification::help_requested(&AlertSnapshot {
        status: AlertStatus::Triggered,
        last_trigger: Some(chrono::Utc::now()),
        connections: 1,
    })
}

fn signer() -> VapidSigner {
    VapidSigner::new(&VapidConfig {
        public_key: PUBLIC_KEY.trim().to_string(),
        private_key_pem: PRIVATE_KEY.to_string(),
        subject: "mailto:admin@example.com".to_string(),
    })
    .expect("fixture key should load")
}

fn subscription(endpoint: String) -> Subscription {
    Subscription {
        endpoint,
        expiration_time: None,
        keys: Some(SubscriptionKeys {
            p256dh: "p256dh-key".to_string(),
            auth: "auth-secret".to_string(),
        }),
    }
}

fn pushover(server: &MockServer, targets: &[&str]) -> PushoverChannel {
    let config = PushoverConfig::new(
        "app-token",
        targets.iter().map(|t| (*t).to_string()).collect(),
    )
    .with_api_url(format!("{}/1/messages.json", server.uri()));
    PushoverChannel::new(config, TIMEOUT).expect("client")
}

#[tokio::test]
async fn pushover_posts_one_form_per_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .and(body_string_contains("token=app-token"))
        .and(body_string_contains("priority=1"))
        .and(body_string_contains("sound=gamelan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 1, "request": "r"})))
        .expect(2)
        .mount(&server)
        .await;

    let channel = pushover(&server, &["userAAAA", "userBBBB"]);
    let results = channel.send(&notification()).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert!(results.iter().all(|r| !r.target.contains("userAAAA")));
}

#[tokio::test]
async fn pushover_failure_for_one_user_keeps_the_other() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("user=baduser"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 0,
            "errors": ["user identifier is invalid"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("user=gooduser"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 1})))
        .mount(&server)
        .await;

    let channel = pushover(&server, &["baduser", "gooduser"]);
    let results = channel.send(&notification()).await.unwrap();

    assert!(!results[0].success);
    assert_eq!(results[0].status_code, Some(400));
    assert_eq!(results[0].message.as_deref(), Some("user identifier is invalid"));
    assert!(results[1].success);
}

#[tokio::test]
async fn pushover_status_zero_is_failure_even_with_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 0})))
        .mount(&server)
        .await;

    let channel = pushover(&server, &["user"]);
    let results = channel.send(&notification()).await.unwrap();

    assert!(!results[0].success);
}

#[tokio::test]
async fn webpush_sends_signed_empty_push() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/abc"))
        .and(header("TTL", "60"))
        .and(header("Urgency", "high"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SubscriptionStore::open(dir.path()));
    store
        .add(subscription(format!("{}/push/abc", server.uri())))
        .unwrap();

    let channel = WebPushChannel::new(Some(signer()), store, TIMEOUT).unwrap();
    let results = channel.send(&notification()).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].status_code, Some(201));

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(auth.starts_with("vapid t="));
    assert!(auth.ends_with(PUBLIC_KEY.trim()));
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn webpush_gone_subscription_does_not_stop_others() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/push/live"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SubscriptionStore::open(dir.path()));
    store
        .add(subscription(format!("{}/push/gone", server.uri())))
        .unwrap();
    store
        .add(subscription(format!("{}/push/live", server.uri())))
        .unwrap();

    let channel = WebPushChannel::new(Some(signer()), store, TIMEOUT).unwrap();
    let results = channel.send(&notification()).await.unwrap();

    assert!(!results[0].success);
    assert_eq!(results[0].status_code, Some(410));
    assert!(results[1].success);
}

#[tokio::test]
async fn dispatcher_reaches_every_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/messages.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/push/one"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(SubscriptionStore::open(dir.path()));
    store
        .add(subscription(format!("{}/push/one", server.uri())))
        .unwrap();

    let dispatcher = Dispatcher::with_channels(vec![
        Arc::new(LogChannel::default()),
        Arc::new(pushover(&server, &["user"])),
        Arc::new(WebPushChannel::new(Some(signer()), store, TIMEOUT).unwrap()),
    ]);

    let results = dispatcher.dispatch_and_wait(&notification()).await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.success));
}

#[tokio::test]
async fn unreachable_relay_is_reported_not_raised() {
    let channel = PushoverChannel::new(
        PushoverConfig::new("token", vec!["user".to_string()])
            .with_api_url("http://127.0.0.1:9/1/messages.json"),
        Duration::from_millis(500),
    )
    .unwrap();

    let results = channel.send(&notification()).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0].message.is_some());
}
