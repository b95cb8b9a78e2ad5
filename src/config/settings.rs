// src/config/settings.rs
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::fetch::{default_headers, DEFAULT_TIMEOUT};
use crate::ingest::scheduler::{RefreshSchedulerCfg, DEFAULT_REFRESH_INTERVAL};
use crate::ingest::service::{PageLimits, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::ingest::AggregatorSettings;

pub const ENV_CACHE_TTL_MS: &str = "FEEDHUB_CACHE_TTL_MS";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "FEEDHUB_REFRESH_INTERVAL_SECS";
pub const ENV_FETCH_TIMEOUT_MS: &str = "FEEDHUB_FETCH_TIMEOUT_MS";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "FEEDHUB_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "FEEDHUB_MAX_PAGE_SIZE";
pub const ENV_BASE_URL: &str = "FEEDHUB_BASE_URL";
pub const ENV_SCHEDULER: &str = "FEEDHUB_SCHEDULER";

const DEFAULT_CACHE_TTL_MS: u64 = 10 * 60 * 1000;

/// Runtime knobs, read from the environment with defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub base_url: Option<String>,
    pub scheduler_enabled: bool,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_TIMEOUT,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            base_url: None,
            scheduler_enabled: true,
        }
    }
}

impl FeedSettings {
    pub fn from_env() -> Self {
        let d = Self::default();

        let mut s = Self {
            cache_ttl: Duration::from_millis(env_or(ENV_CACHE_TTL_MS, DEFAULT_CACHE_TTL_MS)),
            refresh_interval: Duration::from_secs(env_or(
                ENV_REFRESH_INTERVAL_SECS,
                d.refresh_interval.as_secs(),
            )),
            fetch_timeout: Duration::from_millis(env_or(
                ENV_FETCH_TIMEOUT_MS,
                d.fetch_timeout.as_millis() as u64,
            )),
            default_page_size: env_or(ENV_DEFAULT_PAGE_SIZE, d.default_page_size),
            max_page_size: env_or(ENV_MAX_PAGE_SIZE, d.max_page_size),
            base_url: std::env::var(ENV_BASE_URL)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            scheduler_enabled: std::env::var(ENV_SCHEDULER)
                .map(|v| v.trim() != "0")
                .unwrap_or(true),
        };

        // Sanitize
        if s.refresh_interval.is_zero() {
            s.refresh_interval = d.refresh_interval;
        }
        if s.fetch_timeout.is_zero() {
            s.fetch_timeout = d.fetch_timeout;
        }
        s.max_page_size = s.max_page_size.max(1);
        s.default_page_size = s.default_page_size.clamp(1, s.max_page_size);
        s
    }

    pub fn aggregator(&self) -> AggregatorSettings {
        AggregatorSettings {
            ttl: self.cache_ttl,
            fetch_timeout: self.fetch_timeout,
            base_url: self.base_url.clone(),
            default_headers: default_headers(),
        }
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }

    pub fn scheduler(&self) -> RefreshSchedulerCfg {
        RefreshSchedulerCfg {
            interval: self.refresh_interval,
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, default = %default, "invalid setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}
