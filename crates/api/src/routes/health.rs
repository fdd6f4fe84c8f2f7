//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::health;

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Liveness with a component report.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        dedup_store_healthy: health().dedup_store.is_healthy(),
        sink_healthy: health().sink.is_healthy(),
        queue_depth: state.queue.len(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
