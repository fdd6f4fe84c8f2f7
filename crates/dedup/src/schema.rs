//! Dedup store table schema.

/// SQL for creating the dedup table.
///
/// One row per unique `(topic, event_id)`. Rows are never updated or
/// deleted during normal operation.
pub const CREATE_DEDUP_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dedup (
    topic TEXT NOT NULL,
    event_id TEXT NOT NULL,
    received_at TEXT NOT NULL,
    PRIMARY KEY (topic, event_id)
)
"#;

/// All DDL statements in execution order.
pub fn all_tables() -> Vec<&'static str> {
    vec![CREATE_DEDUP_TABLE]
}
