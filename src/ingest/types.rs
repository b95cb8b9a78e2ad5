// src/ingest/types.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One normalized content entry, as handed to rendering collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub url: String,
    pub published_at_millis: i64, // epoch millis
    pub source: String,            // display name, e.g. "IT之家"
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Popularity label from hot-ranking APIs ("-" when the API gives none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hot: Option<String>,
}

/// Payload shape of an upstream source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FeedFormat {
    /// RSS 2.0 or Atom markup.
    MarkupFeed,
    /// `{ code, data: [...] | { list | items } }` hot-ranking JSON.
    JsonArray,
    /// Headless-CMS REST listing (WordPress `wp/v2/posts` shape).
    PlatformRest,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedFormat::MarkupFeed => "markup-feed",
            FeedFormat::JsonArray => "json-array",
            FeedFormat::PlatformRest => "platform-rest",
        };
        f.write_str(s)
    }
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

pub const SOURCE_KEY_PREFIX: &str = "source:";
pub const VIEW_KEY_PREFIX: &str = "view:";

/// Static configuration for one upstream source. Loaded at start, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub category: String,
    pub endpoint: String,
    pub format: FeedFormat,
    /// Retries after the first attempt.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms", alias = "retryBaseDelayMs")]
    pub retry_base_delay_millis: u64,
    /// Extra category names this source answers to (e.g. "AI").
    #[serde(default)]
    pub groups: Vec<String>,
    /// Per-source request headers, layered over the defaults.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        endpoint: impl Into<String>,
        format: FeedFormat,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            endpoint: endpoint.into(),
            format,
            retry_count: default_retry_count(),
            retry_base_delay_millis: default_retry_base_delay_ms(),
            groups: Vec::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_retry(mut self, retry_count: u32, base_delay_millis: u64) -> Self {
        self.retry_count = retry_count;
        self.retry_base_delay_millis = base_delay_millis;
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// True when `category` names this source's category or one of its groups.
    pub fn matches_category(&self, category: &str) -> bool {
        self.category == category || self.groups.iter().any(|g| g == category)
    }

    /// Per-source cache key. Namespaced apart from view keys so no source id
    /// can collide with a composite view key.
    pub fn cache_key(&self) -> String {
        format!("{SOURCE_KEY_PREFIX}{}", self.id)
    }

    pub fn is_absolute(&self) -> bool {
        self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")
    }
}

/// One request shape for aggregate views: the composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewKey {
    pub category: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl ViewKey {
    pub fn new(category: Option<String>, page: u32, page_size: u32) -> Self {
        Self {
            category,
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("{VIEW_KEY_PREFIX}{self}")
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.category.as_deref().unwrap_or("all"),
            self.page,
            self.page_size
        )
    }
}
