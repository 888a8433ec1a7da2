#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use order_webhooks::{
    payload::OrderWebhook,
    queue::{QueueConfig, QueueDeps, QueueHandle, QueueManager, SystemClock},
    routes::router,
    state::AppState,
    storage::{FAILED_WEBHOOKS_KEY, archive_permanent_failure},
};
use serde_json::{Value, json};
use support::{RecordingBeacon, ScriptedSender, TestDb, setup_db, start_time};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    queue: QueueHandle,
    sender: Arc<ScriptedSender>,
    db: TestDb,
}

async fn test_app(admin_api_token: Option<&str>, sender: ScriptedSender) -> TestApp {
    let db = setup_db().await;
    let sender = Arc::new(sender);
    let config = QueueConfig {
        tick_interval: Duration::from_secs(3600),
        followup_delay: Duration::from_secs(3600),
        ..QueueConfig::default()
    };
    let queue = QueueManager::start(
        config.clone(),
        QueueDeps {
            store: db.store.clone(),
            sender: sender.clone(),
            beacon: Arc::new(RecordingBeacon::default()),
            clock: Arc::new(SystemClock),
        },
    );
    let state = AppState {
        store: db.store.clone(),
        queue: queue.clone(),
        config,
        admin_api_token: admin_api_token.map(str::to_string),
    };

    TestApp {
        app: router(state),
        queue,
        sender,
        db,
    }
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn order_webhook_is_accepted_and_delivered() {
    let test = test_app(None, ScriptedSender::always_ok()).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json("/webhooks/orders", &json!({ "order_id": "B2" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response_json(response).await, json!({ "accepted": true }));

    for _ in 0..200 {
        if test.queue.snapshot().await.unwrap().is_empty() && !test.sender.calls().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(test.sender.calls(), vec!["B2"]);
}

#[tokio::test]
async fn non_object_payload_is_still_accepted_but_not_queued() {
    let test = test_app(None, ScriptedSender::always_ok()).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json("/webhooks/orders", &json!("just a string")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(test.queue.snapshot().await.unwrap().is_empty());
    assert!(test.sender.calls().is_empty());
}

#[tokio::test]
async fn unparseable_body_is_a_validation_error() {
    let test = test_app(None, ScriptedSender::always_ok()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/orders")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], "validation");
}

#[tokio::test]
async fn failed_webhook_is_parked_for_next_start() {
    let test = test_app(None, ScriptedSender::always_ok()).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/webhooks/orders/failed",
            &json!({ "orderData": { "order_id": "S1" }, "error": "timeout" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response_json(response).await, json!({ "stored": 1 }));

    let raw = test
        .db
        .store
        .get(FAILED_WEBHOOKS_KEY)
        .await
        .unwrap()
        .expect("stored record");
    let records: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(records[0]["orderData"], json!({ "order_id": "S1" }));
    assert_eq!(records[0]["error"], "timeout");
}

#[tokio::test]
async fn failed_webhook_requires_object_order_data() {
    let test = test_app(None, ScriptedSender::always_ok()).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/webhooks/orders/failed",
            &json!({ "orderData": [1, 2, 3] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn internal_routes_require_token_when_configured() {
    let test = test_app(Some("secret-token"), ScriptedSender::always_ok()).await;

    let missing = test
        .app
        .clone()
        .oneshot(get("/internal/webhooks/queue", None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response_json(missing).await["code"], "unauthorized");

    let wrong = test
        .app
        .clone()
        .oneshot(get("/internal/webhooks/queue", Some("nope")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = test
        .app
        .clone()
        .oneshot(get("/internal/webhooks/queue", Some("secret-token")))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = response_json(ok).await;
    assert_eq!(body["capacity"], 100);
    assert_eq!(body["max_attempts"], 5);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn order_route_is_not_guarded() {
    let test = test_app(Some("secret-token"), ScriptedSender::always_ok()).await;

    let response = test
        .app
        .clone()
        .oneshot(post_json("/webhooks/orders", &json!({ "order_id": "O1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn failures_archive_is_listed_oldest_first() {
    let test = test_app(None, ScriptedSender::always_ok()).await;
    for id in ["A1", "A2"] {
        let payload = OrderWebhook::from_value(json!({ "order_id": id, "order_number": "N" }))
            .unwrap();
        archive_permanent_failure(&test.db.store, &payload, start_time(), 20)
            .await
            .unwrap();
    }

    let response = test
        .app
        .clone()
        .oneshot(get("/internal/webhooks/failures", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0]["orderId"], "A1");
    assert_eq!(failures[1]["orderId"], "A2");
    assert_eq!(failures[0]["orderNumber"], "N");
    assert_eq!(failures[0]["timestamp"], "2024-05-01T12:00:00.000Z");
}

#[tokio::test]
async fn online_signal_reports_trigger_and_503_after_shutdown() {
    let test = test_app(None, ScriptedSender::always_ok()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/internal/webhooks/online")
        .body(Body::empty())
        .unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({ "triggered": true }));

    test.queue.shutdown().await.unwrap();

    let response = test
        .app
        .clone()
        .oneshot(get("/internal/webhooks/queue", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
