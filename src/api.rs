use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ingest::aggregator::LastError;
use crate::ingest::service::{FeedService, ItemQuery};
use crate::ingest::types::Item;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FeedService>,
}

impl AppState {
    pub fn new(service: Arc<FeedService>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/items", get(items))
        .route("/items/grouped", get(items_grouped))
        .route("/categories", get(categories))
        .route("/debug/last-error", get(debug_last_error).delete(clear_last_error))
        .route("/debug/cache", get(debug_cache))
        .route("/admin/clear-cache", post(admin_clear_cache))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn items(State(state): State<AppState>, Query(q): Query<ItemQuery>) -> Json<Vec<Item>> {
    Json(state.service.query(&q).await)
}

async fn items_grouped(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<Item>>> {
    Json(state.service.get_grouped_by_category().await)
}

async fn categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.service.categories())
}

async fn debug_last_error(State(state): State<AppState>) -> Json<Option<LastError>> {
    Json(state.service.last_error())
}

async fn clear_last_error(State(state): State<AppState>) -> &'static str {
    state.service.clear_last_error();
    "cleared"
}

#[derive(serde::Serialize)]
struct CacheInfo {
    keys: Vec<String>,
    views: Vec<String>,
}

async fn debug_cache(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(CacheInfo {
        keys: state.service.aggregator().cache().keys(),
        views: state
            .service
            .known_views()
            .iter()
            .map(|v| v.to_string())
            .collect(),
    })
}

async fn admin_clear_cache(State(state): State<AppState>) -> &'static str {
    state.service.clear_cache();
    "cleared"
}
