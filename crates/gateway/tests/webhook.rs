//! End-to-end tests for webhook intake, driving the router in-process.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    axum::{Router, body::Body},
    chrono::{DateTime, TimeDelta, Utc},
    futures::stream::BoxStream,
    http::{Request, StatusCode},
    secrecy::Secret,
    serde_json::{Value, json},
    tower::ServiceExt,
};

use {
    hourbell_channels::{RecordingGateway, SentMessage},
    hourbell_commands::{CommandInterpreter, HELP_REPLY, START_REPLY, STOP_REPLY},
    hourbell_common::ManualClock,
    hourbell_config::SweepConfig,
    hourbell_gateway::{AppState, BatchSummary, LIVENESS_TEXT, build_app},
    hourbell_line::{SIGNATURE_HEADER, signature::sign},
    hourbell_store::{InMemoryStore, SubscriberStore, Subscription},
    hourbell_sweep::SweepService,
};

const SECRET: &str = "channel-secret";

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_735_689_600_000).unwrap()
}

struct TestApp {
    app: Router,
    store: Arc<InMemoryStore>,
    gateway: Arc<RecordingGateway>,
    clock: Arc<ManualClock>,
}

fn test_app_with(
    store: Arc<dyn SubscriberStore>,
    secret: Option<&str>,
) -> (Router, Arc<RecordingGateway>, Arc<ManualClock>) {
    let gateway = Arc::new(RecordingGateway::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let interpreter = Arc::new(CommandInterpreter::new(store, clock.clone()));
    let state = AppState::new(
        interpreter,
        gateway.clone(),
        secret.map(|s| Secret::new(s.to_string())),
        Duration::from_millis(200),
    );
    (build_app(state), gateway, clock)
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let (app, gateway, clock) = test_app_with(store.clone(), Some(SECRET));
    TestApp {
        app,
        store,
        gateway,
        clock,
    }
}

fn text_event(user: &str, token: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "mode": "active",
        "timestamp": 1_735_689_600_000_i64,
        "replyToken": token,
        "source": { "type": "user", "userId": user },
        "message": { "type": "text", "id": "1", "text": text }
    })
}

fn envelope(events: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({ "destination": "Ubot", "events": events })).unwrap()
}

fn signed_post(path: &str, body: Vec<u8>) -> Request<Body> {
    let signature = sign(&body, SECRET).unwrap();
    Request::post(path)
        .header(SIGNATURE_HEADER, signature)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

fn summary(body: &[u8]) -> BatchSummary {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn get_anywhere_is_liveness() {
    let t = test_app();
    for path in ["/", "/webhook", "/healthz", "/some/deep/path"] {
        let (status, body) = send(&t.app, Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK, "GET {path}");
        assert_eq!(body, LIVENESS_TEXT.as_bytes());
    }
}

#[tokio::test]
async fn other_routes_are_not_found() {
    let t = test_app();
    let cases = [
        Request::post("/other").body(Body::empty()).unwrap(),
        Request::put("/webhook").body(Body::empty()).unwrap(),
        Request::delete("/").body(Body::empty()).unwrap(),
    ];
    for request in cases {
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn start_on_both_paths() {
    let t = test_app();
    for (path, user) in [("/webhook", "U1"), ("/", "U2")] {
        let body = envelope(vec![text_event(user, "rt", "start")]);
        let (status, body) = send(&t.app, signed_post(path, body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary(&body), BatchSummary {
            processed: 1,
            failed: 0
        });
    }
    assert_eq!(t.store.len(), 2);
}

#[tokio::test]
async fn bad_signature_never_reaches_interpreter() {
    let t = test_app();
    let body = envelope(vec![text_event("U1", "rt", "start")]);

    let missing = Request::post("/webhook")
        .body(Body::from(body.clone()))
        .unwrap();
    let wrong = Request::post("/webhook")
        .header(SIGNATURE_HEADER, sign(&body, "other-secret").unwrap())
        .body(Body::from(body.clone()))
        .unwrap();
    let garbage = Request::post("/")
        .header(SIGNATURE_HEADER, "not base64 at all")
        .body(Body::from("{{{ not json"))
        .unwrap();

    for request in [missing, wrong, garbage] {
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    assert!(t.store.is_empty());
    assert!(t.gateway.sent().is_empty());
}

#[tokio::test]
async fn tampered_body_is_rejected() {
    let t = test_app();
    let body = envelope(vec![text_event("U1", "rt", "start")]);
    let signature = sign(&body, SECRET).unwrap();
    let tampered = envelope(vec![text_event("U2", "rt", "start")]);

    let request = Request::post("/webhook")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(tampered))
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(t.store.is_empty());
}

#[tokio::test]
async fn malformed_envelope_is_500_and_processes_nothing() {
    let t = test_app();
    for body in [
        b"not json".to_vec(),
        br#"{"destination":"Ubot"}"#.to_vec(),
        br#"{"events":{"type":"message"}}"#.to_vec(),
    ] {
        let (status, _) = send(&t.app, signed_post("/webhook", body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
    assert!(t.store.is_empty());
    assert!(t.gateway.sent().is_empty());
}

#[tokio::test]
async fn missing_credentials_refuse_intake_but_keep_liveness() {
    let store = Arc::new(InMemoryStore::new());
    let (app, gateway, _) = test_app_with(store.clone(), None);

    let body = envelope(vec![text_event("U1", "rt", "start")]);
    let (status, _) = send(&app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(store.is_empty());
    assert!(gateway.sent().is_empty());

    let (status, _) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_event_does_not_sink_the_batch() {
    let t = test_app();
    let body = envelope(vec![
        text_event("U1", "rt-1", "start"),
        json!({ "type": "message", "message": { "type": "text" } }),
        json!({ "type": "beacon", "source": { "type": "user", "userId": "U9" } }),
        text_event("U2", "rt-2", "start"),
    ]);

    let (status, body) = send(&t.app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary(&body), BatchSummary {
        processed: 4,
        failed: 0
    });
    assert!(t.store.get("U1").await.unwrap().is_some());
    assert!(t.store.get("U2").await.unwrap().is_some());
    assert_eq!(t.gateway.replies().len(), 2);
}

#[tokio::test]
async fn reply_failure_is_reported_without_blocking_siblings() {
    let t = test_app();
    t.gateway.set_fail_all(true);
    let body = envelope(vec![
        text_event("U1", "rt-1", "start"),
        text_event("U2", "rt-2", "start"),
    ]);

    let (status, body) = send(&t.app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(summary(&body), BatchSummary {
        processed: 2,
        failed: 2
    });
    // The state changes still happened; only the replies were lost.
    assert_eq!(t.store.len(), 2);
}

#[tokio::test]
async fn slow_reply_is_bounded() {
    let t = test_app();
    t.gateway.set_delay(Some(Duration::from_secs(30)));
    let body = envelope(vec![text_event("U1", "rt-1", "stop")]);

    let (status, body) = tokio::time::timeout(
        Duration::from_secs(5),
        send(&t.app, signed_post("/webhook", body)),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(summary(&body).failed, 1);
}

struct FailingStore;

#[async_trait]
impl SubscriberStore for FailingStore {
    async fn put(&self, _: &str, _: &Subscription) -> hourbell_store::Result<()> {
        Err(hourbell_store::Error::message("database is locked"))
    }

    async fn delete(&self, _: &str) -> hourbell_store::Result<()> {
        Err(hourbell_store::Error::message("database is locked"))
    }

    async fn get(&self, _: &str) -> hourbell_store::Result<Option<Subscription>> {
        Ok(None)
    }

    fn scan(&self) -> BoxStream<'_, hourbell_store::Result<(String, Subscription)>> {
        Box::pin(futures::stream::empty())
    }

    async fn advance_last_sent(
        &self,
        _: &str,
        _: &Subscription,
        _: DateTime<Utc>,
    ) -> hourbell_store::Result<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn store_failure_fails_that_event_only() {
    let (app, gateway, _) = test_app_with(Arc::new(FailingStore), Some(SECRET));
    let body = envelope(vec![
        text_event("U1", "rt-1", "start"),
        text_event("U2", "rt-2", "what is this"),
    ]);

    let (status, body) = send(&app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(summary(&body), BatchSummary {
        processed: 2,
        failed: 1
    });
    // The help reply for the second event still went out.
    assert_eq!(gateway.replies(), vec![("rt-2".to_string(), HELP_REPLY.to_string())]);
}

#[tokio::test]
async fn follow_and_unfollow_are_silent_no_ops() {
    let t = test_app();
    t.store.put("U1", &Subscription::new(t0())).await.unwrap();
    let body = envelope(vec![
        json!({ "type": "follow", "replyToken": "rt-f", "source": { "type": "user", "userId": "U2" } }),
        json!({ "type": "unfollow", "source": { "type": "user", "userId": "U1" } }),
    ]);

    let (status, body) = send(&t.app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary(&body), BatchSummary {
        processed: 2,
        failed: 0
    });
    assert_eq!(t.store.get("U1").await.unwrap(), Some(Subscription::new(t0())));
    assert!(t.store.get("U2").await.unwrap().is_none());
    assert!(t.gateway.sent().is_empty());
}

#[tokio::test]
async fn subscribe_deliver_unsubscribe() {
    let t = test_app();
    let sweep = SweepService::new(
        t.store.clone(),
        t.gateway.clone(),
        t.clock.clone(),
        SweepConfig {
            notify_interval: Duration::from_secs(60 * 60),
            broadcast_message: "ding".into(),
            ..SweepConfig::default()
        },
    );

    let body = envelope(vec![text_event("U1", "rt-1", "  START ")]);
    let (status, _) = send(&t.app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.store.get("U1").await.unwrap(), Some(Subscription::new(t0())));
    assert_eq!(t.gateway.replies(), vec![("rt-1".to_string(), START_REPLY.to_string())]);

    t.clock.set(t0() + TimeDelta::minutes(61));
    let report = sweep.run_once().await;
    assert_eq!(report.delivered, 1);
    let sub = t.store.get("U1").await.unwrap().unwrap();
    assert_eq!(sub.last_sent_time, t0() + TimeDelta::minutes(61));

    let body = envelope(vec![text_event("U1", "rt-2", "stop")]);
    let (status, _) = send(&t.app, signed_post("/webhook", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(t.store.get("U1").await.unwrap().is_none());
    assert_eq!(t.gateway.replies()[1], ("rt-2".to_string(), STOP_REPLY.to_string()));

    t.clock.advance(TimeDelta::hours(3));
    let report = sweep.run_once().await;
    assert_eq!(report.scanned, 0);
    let pushes: Vec<_> = t
        .gateway
        .sent()
        .into_iter()
        .filter(|m| matches!(m, SentMessage::Push { .. }))
        .collect();
    assert_eq!(pushes, vec![SentMessage::Push {
        to: "U1".into(),
        text: "ding".into()
    }]);
}
