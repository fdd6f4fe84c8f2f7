//! Stats endpoint.

use axum::{extract::State, Json};
use telemetry::StatsSnapshot;

use crate::state::AppState;

/// GET /stats - Pipeline counters, known topics and uptime.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}
