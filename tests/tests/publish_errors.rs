//! Tests for rejected publish requests.
//!
//! Every rejection must leave the queue and the counters untouched.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};

async fn assert_rejected(payload: String, code: &str) {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/publish")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], code, "unexpected error body: {}", body);
    assert!(body["error"].is_string());

    assert_eq!(ctx.queue.unfinished(), 0, "Nothing may be enqueued");
    assert_eq!(ctx.stats.received(), 0);
    assert!(ctx.stats.topics().is_empty());
}

/// Test invalid JSON returns VALID_001
#[tokio::test]
async fn test_invalid_json_returns_400() {
    assert_rejected("not json at all".to_string(), "VALID_001").await;
}

/// Test truncated JSON returns VALID_001
#[tokio::test]
async fn test_malformed_json_returns_400() {
    assert_rejected(r#"[{"topic": "orders", "event_id": "#.to_string(), "VALID_001").await;
}

/// A scalar body is neither an event nor a list of events.
#[tokio::test]
async fn test_scalar_body_returns_400() {
    assert_rejected("42".to_string(), "VALID_001").await;
}

/// Test missing required fields return VALID_001
#[tokio::test]
async fn test_missing_fields_return_400() {
    for field in ["topic", "event_id", "timestamp", "source", "payload"] {
        let mut event = fixtures::unique_event("orders");
        event.as_object_mut().unwrap().remove(field);
        assert_rejected(fixtures::single_payload(event), "VALID_001").await;
    }
}

/// Test payload that is not an object returns VALID_001
#[tokio::test]
async fn test_non_object_payload_returns_400() {
    let mut event = fixtures::unique_event("orders");
    event["payload"] = json!([1, 2, 3]);
    assert_rejected(fixtures::single_payload(event), "VALID_001").await;
}

/// Test unparseable timestamp returns VALID_001
#[tokio::test]
async fn test_bad_timestamp_returns_400() {
    let mut event = fixtures::unique_event("orders");
    event["timestamp"] = json!("yesterday");
    assert_rejected(fixtures::single_payload(event), "VALID_001").await;
}

/// Test empty strings return VALID_001
#[tokio::test]
async fn test_empty_fields_return_400() {
    for field in ["topic", "event_id", "source"] {
        let mut event = fixtures::unique_event("orders");
        event[field] = json!("");
        assert_rejected(fixtures::single_payload(event), "VALID_001").await;
    }
}

/// A topic that cannot be a file name is rejected.
#[tokio::test]
async fn test_unsafe_topic_returns_400() {
    let event = fixtures::unique_event("../etc/passwd");
    assert_rejected(fixtures::single_payload(event), "VALID_001").await;
}

/// One bad event rejects the whole batch.
#[tokio::test]
async fn test_one_invalid_event_rejects_batch() {
    let mut bad = fixtures::unique_event("orders");
    bad["source"] = json!("");
    let batch = vec![fixtures::unique_event("orders"), bad];

    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let response = server
        .post("/publish")
        .content_type("application/json")
        .bytes(fixtures::array_payload(batch).into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert!(details[0].as_str().unwrap().contains("event[1]"));
    assert_eq!(ctx.queue.unfinished(), 0);
}

/// Test batch exceeding 1000 events returns VALID_002
#[tokio::test]
async fn test_batch_exceeds_limit_returns_400() {
    assert_rejected(
        fixtures::array_payload(fixtures::oversized_batch()),
        "VALID_002",
    )
    .await;
}

/// Test body over 1MB returns VALID_002
#[tokio::test]
async fn test_body_too_large_returns_400() {
    let events: Vec<Value> = (0..20).map(|_| fixtures::oversized_event()).collect();
    assert_rejected(fixtures::array_payload(events), "VALID_002").await;
}

/// Test oversized single event returns VALID_003
#[tokio::test]
async fn test_event_too_large_returns_400() {
    assert_rejected(
        fixtures::single_payload(fixtures::oversized_event()),
        "VALID_003",
    )
    .await;
}

/// Unsafe topic filters on the read side are rejected too.
#[tokio::test]
async fn test_events_with_unsafe_topic_returns_400() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .get("/events")
        .add_query_param("topic", "../dedup")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
