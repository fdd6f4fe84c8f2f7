//! API routes.

pub mod events;
pub mod health;
pub mod publish;
pub mod stats;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::response::ServiceInfo;
use crate::state::AppState;

const ENDPOINTS: [&str; 7] = [
    "/",
    "/publish",
    "/events",
    "/stats",
    "/health",
    "/health/ready",
    "/health/live",
];

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/publish", post(publish::publish_handler))
        .route("/events", get(events::events_handler))
        .route("/stats", get(stats::stats_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// GET / - Service banner.
pub async fn root_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Event Aggregator".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}
