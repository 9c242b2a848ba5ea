//! Opportunity Aggregator — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the adapter chains, shared state,
//! and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opportunity_aggregator::api;
use opportunity_aggregator::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - AGGREGATOR_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("AGGREGATOR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("opportunity_aggregator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This supplies
    // provider credentials (RAPIDAPI_KEY, EVENTBRITE_TOKEN, ...) and the
    // optional SOURCES_CONFIG_PATH override.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let state = api::AppState::from_env();
    let metrics = Metrics::init();
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
