//! feedhub: binary entrypoint
//! Boots the Axum HTTP server, loads sources, and starts the background refresh.

use anyhow::Context;
use feedhub::ingest::config::load_sources_default;
use feedhub::ingest::scheduler::spawn_refresh_scheduler;
use feedhub::metrics::Metrics;
use feedhub::FeedSettings;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - FEEDHUB_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("FEEDHUB_DEV_LOG")
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

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedhub=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let settings = FeedSettings::from_env();
    let sources = load_sources_default().context("loading source descriptors")?;
    if sources.is_empty() {
        tracing::warn!("no sources configured; every view will be empty");
    }

    let metrics = Metrics::init(settings.cache_ttl.as_millis() as u64, sources.len())?;
    let service = feedhub::build_service(&settings, sources)?;

    if settings.scheduler_enabled {
        spawn_refresh_scheduler(service.clone(), settings.scheduler());
    }

    let router = feedhub::app(service).merge(metrics.router());

    Ok(router.into())
}
