// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::FeedSettings;
pub use crate::ingest::{FeedService, Item, ItemQuery, SourceDescriptor};

use std::sync::Arc;

use crate::ingest::config::validate_sources;
use crate::ingest::fetch::HttpFetcher;
use tracing::info;

/// Validate `sources` against `settings` and build the shared service on top
/// of the real HTTP fetcher.
pub fn build_service(
    settings: &FeedSettings,
    sources: Vec<SourceDescriptor>,
) -> anyhow::Result<Arc<FeedService>> {
    validate_sources(&sources, settings.base_url.as_deref())?;
    info!(
        sources = sources.len(),
        ttl_ms = settings.cache_ttl.as_millis() as u64,
        refresh_secs = settings.refresh_interval.as_secs(),
        "feed service configured"
    );
    Ok(FeedService::shared(
        Arc::new(HttpFetcher::new()),
        settings.aggregator(),
        sources,
        settings.page_limits(),
    ))
}

/// Router over an already built service.
pub fn app(service: Arc<FeedService>) -> axum::Router {
    api::router(api::AppState::new(service))
}
