//! HTTP boundary for the event aggregator.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
