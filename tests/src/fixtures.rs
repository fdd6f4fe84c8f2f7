//! Test fixtures and event generators.

use chrono::Utc;
use uuid::Uuid;

/// A valid event JSON with the given identity.
pub fn event(topic: &str, event_id: &str) -> serde_json::Value {
    serde_json::json!({
        "topic": topic,
        "event_id": event_id,
        "timestamp": Utc::now().to_rfc3339(),
        "source": "integration-tests",
        "payload": { "n": event_id }
    })
}

/// A valid event JSON with a fresh random id.
pub fn unique_event(topic: &str) -> serde_json::Value {
    event(topic, &Uuid::new_v4().to_string())
}

/// Generate N valid events for one topic.
pub fn unique_events(n: usize, topic: &str) -> Vec<serde_json::Value> {
    (0..n).map(|_| unique_event(topic)).collect()
}

/// The order event used by the documented publish example.
pub fn order_42() -> serde_json::Value {
    serde_json::json!({
        "topic": "orders",
        "event_id": "42",
        "timestamp": "2025-01-01T00:00:00Z",
        "source": "svc",
        "payload": { "amount": 10 }
    })
}

/// Generate array format payload.
pub fn array_payload(events: Vec<serde_json::Value>) -> String {
    serde_json::to_string(&events).unwrap()
}

/// Generate single event payload.
pub fn single_payload(event: serde_json::Value) -> String {
    event.to_string()
}

/// Generate an oversized event (> 64KB).
pub fn oversized_event() -> serde_json::Value {
    let mut event = unique_event("orders");
    // 70KB of data exceeds the 64KB limit
    event["payload"]["blob"] = serde_json::Value::String("x".repeat(70_000));
    event
}

/// Generate a batch that exceeds the event limit.
pub fn oversized_batch() -> Vec<serde_json::Value> {
    unique_events(1001, "orders") // Exceeds 1000 limit
}
