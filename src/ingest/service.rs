// src/ingest/service.rs
//! The facade external collaborators call: filtered, paginated item views.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use serde::Deserialize;

use crate::ingest::aggregator::{Aggregator, LastError};
use crate::ingest::fetch::Fetcher;
use crate::ingest::types::{Item, SourceDescriptor, ViewKey};
use crate::ingest::AggregatorSettings;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Category values that mean "no filter".
const ALL_CATEGORIES: &[&str] = &["all", "全部"];

/// Query shape used by the HTTP layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, alias = "pageSize")]
    pub page_size: Option<u32>,
    #[serde(default, alias = "forceRefresh")]
    pub force: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

pub struct FeedService {
    aggregator: Aggregator,
    sources: Vec<SourceDescriptor>,
    limits: PageLimits,
    /// Every view requested since start (or since the last cache clear), except
    /// pages that started past the end of the data.
    views: Mutex<BTreeSet<ViewKey>>,
}

impl FeedService {
    pub fn new(aggregator: Aggregator, sources: Vec<SourceDescriptor>, limits: PageLimits) -> Self {
        Self {
            aggregator,
            sources,
            limits,
            views: Mutex::new(BTreeSet::new()),
        }
    }

    /// Convenience constructor wiring a fetcher straight into a shared service.
    pub fn shared(
        fetcher: Arc<dyn Fetcher>,
        settings: AggregatorSettings,
        sources: Vec<SourceDescriptor>,
        limits: PageLimits,
    ) -> Arc<Self> {
        Arc::new(Self::new(Aggregator::new(fetcher, settings), sources, limits))
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    fn views(&self) -> MutexGuard<'_, BTreeSet<ViewKey>> {
        match self.views.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Items for one view. Never fails; partial outages yield partial (or
    /// stale) lists and a total outage with no cache yields an empty one.
    pub async fn get_items(
        &self,
        category: Option<&str>,
        page: u32,
        page_size: u32,
        force_refresh: bool,
    ) -> Vec<Item> {
        let category = normalize_category(category);
        let page_size = page_size.clamp(1, self.limits.max_page_size.max(1));
        let view = ViewKey::new(category, page, page_size);

        let selected = self.select_sources(view.category.as_deref());
        if selected.is_empty() {
            tracing::debug!(view = %view, "no sources match view");
            return Vec::new();
        }

        let items = self
            .aggregator
            .fetch_many(&selected, &view, force_refresh)
            .await;
        // Pages past the end of the data are not kept warm.
        if view.page == 1 || !items.is_empty() {
            self.views().insert(view);
        }
        items
    }

    pub async fn query(&self, q: &ItemQuery) -> Vec<Item> {
        self.get_items(
            q.category.as_deref(),
            q.page.unwrap_or(1),
            q.page_size.unwrap_or(self.limits.default_page_size),
            q.force,
        )
        .await
    }

    /// First page of every known category, fetched concurrently.
    pub async fn get_grouped_by_category(&self) -> BTreeMap<String, Vec<Item>> {
        let categories = self.categories();
        let pages = join_all(categories.iter().map(|c| {
            self.get_items(Some(c.as_str()), 1, self.limits.default_page_size, false)
        }))
        .await;
        categories.into_iter().zip(pages).collect()
    }

    /// Distinct source categories in registration order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.sources
            .iter()
            .filter(|s| seen.insert(s.category.as_str()))
            .map(|s| s.category.clone())
            .collect()
    }

    /// Drops all cached entries and forgets remembered views.
    pub fn clear_cache(&self) {
        self.aggregator.clear_cache();
        self.views().clear();
        tracing::info!("cache cleared");
    }

    pub fn known_views(&self) -> Vec<ViewKey> {
        self.views().iter().cloned().collect()
    }

    /// Forced refresh of one remembered view. Returns the item count.
    pub async fn refresh_view(&self, view: &ViewKey) -> usize {
        let selected = self.select_sources(view.category.as_deref());
        self.aggregator
            .fetch_many(&selected, view, true)
            .await
            .len()
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.aggregator.last_error()
    }

    pub fn clear_last_error(&self) {
        self.aggregator.clear_last_error();
    }

    fn select_sources(&self, category: Option<&str>) -> Vec<SourceDescriptor> {
        match category {
            None => self.sources.clone(),
            Some(c) => self
                .sources
                .iter()
                .filter(|s| s.matches_category(c))
                .cloned()
                .collect(),
        }
    }
}

fn normalize_category(category: Option<&str>) -> Option<String> {
    let c = category?.trim();
    if c.is_empty() || ALL_CATEGORIES.iter().any(|a| a.eq_ignore_ascii_case(c)) {
        return None;
    }
    Some(c.to_string())
}
