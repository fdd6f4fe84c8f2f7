//! Publish endpoint handler.
//!
//! Accepts one event object or a JSON array of them. The request is
//! all-or-nothing: if any event fails validation nothing is enqueued.

use aggregator_core::{
    limits::{MAX_BATCH_EVENTS, MAX_BATCH_SIZE_BYTES},
    validate_batch, Error, PublishPayload, ValidationErrorCode,
};
use axum::{body::Bytes, extract::State, Json};
use tracing::{debug, error, info, warn};

use crate::response::{ApiError, PublishResponse};
use crate::state::AppState;

/// POST /publish - Validate and enqueue events for the consumer pool.
pub async fn publish_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    // Check payload size before parsing
    if body.len() > MAX_BATCH_SIZE_BYTES {
        return Err(ApiError::validation(
            ValidationErrorCode::BatchTooLarge.code(),
            vec![format!(
                "Payload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_BATCH_SIZE_BYTES / 1024
            )],
        ));
    }

    debug!(payload_size = body.len(), "Received publish request");

    let payload = PublishPayload::parse(&body).map_err(|e| {
        warn!(error = %e, "Rejected malformed publish payload");
        ApiError::from(e)
    })?;

    if payload.len() > MAX_BATCH_EVENTS {
        return Err(ApiError::validation(
            ValidationErrorCode::BatchTooLarge.code(),
            vec![format!(
                "Batch has {} events, exceeds {} limit",
                payload.len(),
                MAX_BATCH_EVENTS
            )],
        ));
    }

    let errors = validate_batch(&payload.events);
    if !errors.is_empty() {
        warn!(rejected = errors.len(), "Some events failed validation");
        return Err(ApiError::validation(
            batch_error_code(&errors),
            errors.iter().map(|e| e.to_string()).collect(),
        ));
    }

    let accepted = payload.len();
    for event in payload.events {
        let topic = event.topic.clone();
        state.queue.put(event).await.map_err(|e| {
            error!(error = %e, "Failed to enqueue event");
            ApiError::internal("Failed to enqueue events")
        })?;
        state.stats.record_received(&topic);
    }

    info!(
        accepted = accepted,
        queue_depth = state.queue.len(),
        "Publish request enqueued"
    );

    Ok(Json(PublishResponse::accepted(accepted)))
}

/// The first coded validation error wins; plain ones report `VALID_001`.
fn batch_error_code(errors: &[Error]) -> &'static str {
    errors
        .iter()
        .find_map(Error::error_code)
        .unwrap_or(ValidationErrorCode::InvalidFormat.code())
}
