//! Restart behavior: topics and dedup records survive, counters do not.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use serde_json::Value;
use tempfile::TempDir;

async fn publish_and_drain(ctx: &TestContext, events: Vec<Value>) {
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    server
        .post("/publish")
        .content_type("application/json")
        .bytes(fixtures::array_payload(events).into())
        .await
        .assert_status_ok();
    ctx.drain().await;
}

/// Topics with files on disk are known after a restart.
#[tokio::test]
async fn test_topics_recovered_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = TestContext::open(dir.path()).await;
        publish_and_drain(
            &ctx,
            vec![
                fixtures::event("orders", "o1"),
                fixtures::event("payments", "p1"),
            ],
        )
        .await;
        ctx.store.close().await;
    }

    let ctx = TestContext::open(dir.path()).await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let stats: Value = server.get("/stats").await.json();

    assert_eq!(stats["topics"], serde_json::json!(["orders", "payments"]));
    assert_eq!(stats["received"], 0);
    assert_eq!(stats["unique_processed"], 0);
}

/// An event stored before a restart is a duplicate after it.
#[tokio::test]
async fn test_dedup_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let ctx = TestContext::open(dir.path()).await;
        publish_and_drain(&ctx, vec![fixtures::order_42()]).await;
        ctx.store.close().await;
    }

    let ctx = TestContext::open(dir.path()).await;
    publish_and_drain(&ctx, vec![fixtures::order_42()]).await;

    assert_eq!(ctx.stats.duplicate_dropped(), 1);
    assert_eq!(ctx.stats.unique_processed(), 0);
    assert_eq!(ctx.topic_lines("orders"), 1);

    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let events: Vec<Value> = server.get("/events").await.json();
    assert_eq!(events, vec![fixtures::order_42()]);
}

/// A fresh data directory starts with no topics.
#[tokio::test]
async fn test_empty_directory_recovers_nothing() {
    let ctx = TestContext::new().await;
    assert!(ctx.stats.topics().is_empty());
    assert!(ctx.root.join("processed").is_dir());
}
