//! Tests for health check endpoints.
//!
//! The health registry is process-wide, so only one test here touches it.
//! The rest neither process events nor set component health.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use telemetry::health;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    for field in ["status", "dedup_store_healthy", "sink_healthy", "queue_depth"] {
        assert!(
            body.get(field).is_some(),
            "Response should have '{}' field",
            field
        );
    }

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );
}

/// Queue depth reflects events waiting for a consumer.
#[tokio::test]
async fn test_health_reports_queue_depth() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/publish")
        .content_type("application/json")
        .bytes(fixtures::array_payload(fixtures::unique_events(3, "orders")).into())
        .await
        .assert_status_ok();

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["queue_depth"], 3);

    // Dequeue without processing; processing would update health
    while let Some(delivery) = ctx.queue.try_get() {
        delivery.ack();
    }
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["queue_depth"], 0);
}

/// Test /health/live is always OK
#[tokio::test]
async fn test_liveness_probe() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

/// Readiness follows the storage components.
#[tokio::test]
async fn test_readiness_follows_components() {
    let ctx = TestContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    health().dedup_store.set_healthy();
    health().sink.set_unhealthy("Processed directory not writable");
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    health().sink.set_healthy();
    server.get("/health/ready").await.assert_status_ok();

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dedup_store_healthy"], true);
    assert_eq!(body["sink_healthy"], true);
}
