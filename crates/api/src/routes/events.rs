//! Read-back of persisted events.

use aggregator_core::Event;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::error;

use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub topic: Option<String>,
}

/// GET /events?topic= - Every persisted event, optionally for one topic.
///
/// Reads the sink directly, so an event shows up here only once a consumer
/// has appended it.
pub async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let topic = query.topic.as_deref().filter(|t| !t.is_empty());

    let events = state.sink.list_events(topic).await.map_err(|e| {
        if e.is_storage() {
            error!(error = %e, "Failed to read persisted events");
        }
        ApiError::from(e)
    })?;

    Ok(Json(events))
}
