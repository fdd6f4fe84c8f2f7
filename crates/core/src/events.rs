//! Event model and publish payload parsing.
//!
//! Publishers send either a single event object or an array of events:
//! 1. Single event: `{ "topic": "...", "event_id": "...", ... }`
//! 2. Array: `[event, event, ...]`

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{MAX_EVENT_SIZE_BYTES, MAX_TOPIC_LEN};

/// A published event.
///
/// Identity is `(topic, event_id)`. The timestamp keeps the publisher's
/// original ISO-8601 string so persisted lines reproduce what was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Event {
    /// Partition key for storage and the dedup namespace
    #[validate(length(min = 1, max = 240))]
    pub topic: String,

    /// Unique within a topic
    #[validate(length(min = 1, max = 256))]
    pub event_id: String,

    /// ISO-8601 timestamp
    #[validate(length(min = 1, max = 64))]
    pub timestamp: String,

    /// Publishing service
    #[validate(length(min = 1, max = 256))]
    pub source: String,

    /// Arbitrary event body
    pub payload: Map<String, Value>,
}

impl Event {
    /// Borrowed identity of this event.
    pub fn key(&self) -> EventKey<'_> {
        EventKey {
            topic: &self.topic,
            event_id: &self.event_id,
        }
    }

    /// Parses the timestamp as RFC 3339, or as a naive ISO-8601 date-time
    /// interpreted as UTC.
    pub fn parsed_timestamp(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// `(topic, event_id)` pair identifying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey<'a> {
    pub topic: &'a str,
    pub event_id: &'a str,
}

impl fmt::Display for EventKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, self.event_id)
    }
}

/// Parse an ISO-8601 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::validation(format!("timestamp '{}' is not ISO-8601", raw)))
}

/// Check that a topic is usable as a file name.
///
/// Allowed: ASCII alphanumerics, `.`, `_`, `-`, starting with an alphanumeric.
pub fn validate_topic(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(Error::invalid_topic("topic is required"));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(Error::invalid_topic(format!(
            "topic exceeds {} bytes",
            MAX_TOPIC_LEN
        )));
    }

    let mut chars = topic.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if !first_ok || !rest_ok {
        return Err(Error::invalid_topic(format!(
            "'{}' must match [A-Za-z0-9][A-Za-z0-9._-]*",
            topic
        )));
    }

    Ok(())
}

/// Validate a single event.
pub fn validate_event(event: &Event) -> Result<()> {
    // Run validator derive validations
    event
        .validate()
        .map_err(|e| Error::validation(format!("{}", e)))?;

    // Whitespace-only values count as missing
    if event.event_id.trim().is_empty() {
        return Err(Error::validation("event_id is required"));
    }
    if event.source.trim().is_empty() {
        return Err(Error::validation("source is required"));
    }

    validate_topic(&event.topic)?;
    event.parsed_timestamp()?;

    let size = serde_json::to_vec(event)?.len();
    if size > MAX_EVENT_SIZE_BYTES {
        return Err(Error::validation_code(
            ValidationErrorCode::EventTooLarge,
            format!(
                "event {} is {}KB, exceeds {}KB limit",
                event.key(),
                size / 1024,
                MAX_EVENT_SIZE_BYTES / 1024
            ),
        ));
    }

    Ok(())
}

/// Validate every event in a batch, collecting one error per invalid event.
pub fn validate_batch(events: &[Event]) -> Vec<Error> {
    events
        .iter()
        .enumerate()
        .filter_map(|(i, event)| match validate_event(event) {
            Ok(()) => None,
            Err(Error::ValidationWithCode { code, message, http_status }) => {
                Some(Error::ValidationWithCode {
                    code,
                    message: format!("event[{}]: {}", i, message),
                    http_status,
                })
            }
            Err(e) => Some(Error::validation(format!("event[{}]: {}", i, e))),
        })
        .collect()
}

/// Parsed publish request body.
#[derive(Debug, Clone)]
pub struct PublishPayload {
    pub events: Vec<Event>,
}

impl PublishPayload {
    /// Parse a publish body from JSON bytes.
    ///
    /// Structural problems (bad JSON, wrong shape, missing or mistyped
    /// fields) are reported here; field content is checked by
    /// [`validate_batch`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation(format!("invalid JSON: {}", e)))?;

        match value {
            Value::Array(items) => {
                let events = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        serde_json::from_value::<Event>(item)
                            .map_err(|e| Error::validation(format!("event[{}]: {}", i, e)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self { events })
            }

            Value::Object(_) => {
                let event: Event = serde_json::from_value(value)
                    .map_err(|e| Error::validation(format!("invalid event: {}", e)))?;
                Ok(Self {
                    events: vec![event],
                })
            }

            _ => Err(Error::validation(
                "request body must be an event object or an array of events",
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
