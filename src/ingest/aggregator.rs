// src/ingest/aggregator.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use serde::Serialize;

use crate::ingest::cache::{now_millis, CacheStore};
use crate::ingest::error::SourceError;
use crate::ingest::fetch::{
    default_headers, merge_headers, resolve_url, FetchRequest, Fetcher, DEFAULT_TIMEOUT,
};
use crate::ingest::providers::parse_payload;
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::{Item, SourceDescriptor, ViewKey};

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Freshness window for both per-source and per-view entries.
    pub ttl: Duration,
    pub fetch_timeout: Duration,
    /// Prefix for relative source endpoints.
    pub base_url: Option<String>,
    pub default_headers: Vec<(String, String)>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            fetch_timeout: DEFAULT_TIMEOUT,
            base_url: None,
            default_headers: default_headers(),
        }
    }
}

/// Most recent source failure, for diagnostics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastError {
    pub source_id: String,
    pub message: String,
    pub at_millis: i64,
}

/// Orchestrates fetch + retry + parse per source and merges sources into views.
/// The cache is the only shared mutable state; callers and the refresh
/// scheduler both go through here.
pub struct Aggregator {
    fetcher: Arc<dyn Fetcher>,
    cache: CacheStore,
    settings: AggregatorSettings,
    last_error: Mutex<Option<LastError>>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: AggregatorSettings) -> Self {
        crate::ingest::ensure_metrics_described();
        Self {
            fetcher,
            cache: CacheStore::new(),
            settings,
            last_error: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch one source with retries, then parse it. Network failures are
    /// retried per the source's policy; unreadable payloads are not.
    pub async fn fetch_one(&self, source: &SourceDescriptor) -> Result<Vec<Item>, SourceError> {
        let policy = RetryPolicy::for_source(source);
        let req = FetchRequest {
            url: resolve_url(&source.endpoint, self.settings.base_url.as_deref()),
            headers: merge_headers(&self.settings.default_headers, &source.headers),
            timeout: self.settings.fetch_timeout,
        };

        let mut retries = 0u32;
        let body = loop {
            counter!("feed_fetch_total", "source" => source.id.clone()).increment(1);
            match self.fetcher.fetch(&req).await {
                Ok(body) => break body,
                Err(e) if policy.should_retry(retries) => {
                    retries += 1;
                    let delay = policy.delay_for(retries);
                    tracing::debug!(
                        source = %source.id,
                        error = %e,
                        retry = retries,
                        max_retries = policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    counter!("feed_retries_total", "source" => source.id.clone()).increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(SourceError::Unavailable {
                        source_id: source.id.clone(),
                        attempts: retries + 1,
                        last: e,
                    });
                }
            }
        };

        parse_payload(&body, source, now_millis()).map_err(|error| SourceError::Format {
            source_id: source.id.clone(),
            error,
        })
    }

    /// Per-source read-through: a fresh entry is used as is, otherwise the
    /// source is fetched and a success is written back.
    async fn load_source(
        &self,
        source: &SourceDescriptor,
        force_refresh: bool,
    ) -> Result<Vec<Item>, SourceError> {
        let key = source.cache_key();
        if !force_refresh {
            if let Some(entry) = self.cache.read(&key) {
                if CacheStore::is_fresh(&entry, self.settings.ttl) {
                    counter!("feed_cache_hits_total", "scope" => "source").increment(1);
                    return Ok(entry.data);
                }
            }
        }
        let items = self.fetch_one(source).await?;
        self.cache.write(&key, items.clone(), true);
        Ok(items)
    }

    /// Fan out over `sources`, fan in every outcome, fall back to last known
    /// data for failed sources, then merge, sort and paginate into `view`.
    /// Never fails: a view nobody can serve is an empty list.
    pub async fn fetch_many(
        &self,
        sources: &[SourceDescriptor],
        view: &ViewKey,
        force_refresh: bool,
    ) -> Vec<Item> {
        let view_key = view.cache_key();
        if !force_refresh {
            if let Some(entry) = self.cache.read(&view_key) {
                if CacheStore::is_fresh(&entry, self.settings.ttl) {
                    counter!("feed_cache_hits_total", "scope" => "view").increment(1);
                    return entry.data;
                }
            }
        }

        let outcomes: Vec<Result<Vec<Item>, SourceError>> = join_all(
            sources
                .iter()
                .map(|source| self.load_source(source, force_refresh)),
        )
        .await;

        let mut per_source = Vec::with_capacity(sources.len());
        let mut any_ok = false;
        for (source, outcome) in sources.iter().zip(outcomes) {
            match outcome {
                Ok(items) => {
                    any_ok = true;
                    per_source.push(items);
                }
                Err(e) => {
                    self.note_failure(&e);
                    let key = source.cache_key();
                    self.cache.record_failure(&key);
                    match self.cache.read(&key) {
                        Some(entry) if !entry.data.is_empty() => {
                            tracing::info!(
                                source = %source.id,
                                failures = entry.consecutive_failure_count,
                                "serving stale data"
                            );
                            counter!("feed_stale_served_total", "source" => source.id.clone())
                                .increment(1);
                            per_source.push(entry.data);
                        }
                        _ => per_source.push(Vec::new()),
                    }
                }
            }
        }

        let page = merge_and_paginate(per_source, view.page, view.page_size);
        if any_ok {
            self.cache.write(&view_key, page.clone(), true);
        } else {
            self.cache.record_failure(&view_key);
        }
        page
    }

    fn note_failure(&self, e: &SourceError) {
        tracing::warn!(source = e.source_id(), error = %e, "source failed");
        counter!("feed_fetch_errors_total", "source" => e.source_id().to_string()).increment(1);
        let mut guard = match self.last_error.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        *guard = Some(LastError {
            source_id: e.source_id().to_string(),
            message: e.to_string(),
            at_millis: now_millis(),
        });
    }

    pub fn last_error(&self) -> Option<LastError> {
        match self.last_error.lock() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn clear_last_error(&self) {
        match self.last_error.lock() {
            Ok(mut g) => *g = None,
            Err(poison) => *poison.into_inner() = None,
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Concatenate in source order, stable-sort newest first, then slice the page.
/// Equal timestamps keep source registration order.
pub fn merge_and_paginate(per_source: Vec<Vec<Item>>, page: u32, page_size: u32) -> Vec<Item> {
    let mut all: Vec<Item> = per_source.into_iter().flatten().collect();
    all.sort_by(|a, b| b.published_at_millis.cmp(&a.published_at_millis));

    let page = page.max(1) as usize;
    let page_size = page_size.max(1) as usize;
    all.into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect()
}
