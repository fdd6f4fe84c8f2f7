//! Subscriber setup for structured logging.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Our crates at info, sqlx statement logging quieted.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Installs the global subscriber.
///
/// An unparsable `filter` falls back to [`DEFAULT_FILTER`]. JSON output
/// carries thread ids and source locations for log shippers.
pub fn init_tracing(filter: &str, json: bool) {
    let env_filter =
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }

    tracing::info!(filter, json, "Logging ready");
}

/// Reads `RUST_LOG` for the filter and `LOG_JSON=1|true` for the format.
pub fn init_tracing_from_env() {
    let json = std::env::var("LOG_JSON")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    init_tracing(&filter, json);
}
