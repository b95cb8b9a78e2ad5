// src/ingest/providers/mod.rs
//! Format adapters: one per payload shape, selected by `SourceDescriptor::format`.

pub mod json_array;
pub mod markup_feed;
pub mod platform_rest;

use metrics::{counter, histogram};

use crate::ingest::error::FormatError;
use crate::ingest::types::{FeedFormat, Item, SourceDescriptor};
use crate::ingest::{clean_description, normalize_title, parse_published_millis};

pub use json_array::JsonArrayAdapter;
pub use markup_feed::MarkupFeedAdapter;
pub use platform_rest::PlatformRestAdapter;

/// Per-parse inputs shared by all adapters.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub source: &'a SourceDescriptor,
    /// Stamp used for entries that carry no parseable timestamp.
    pub now_millis: i64,
}

pub trait FormatAdapter: Send + Sync {
    fn format(&self) -> FeedFormat;

    /// Unusable entries are dropped; only an unreadable payload is an error.
    fn parse(&self, body: &str, ctx: &ParseContext<'_>) -> Result<Vec<Item>, FormatError>;
}

static MARKUP_FEED: MarkupFeedAdapter = MarkupFeedAdapter;
static JSON_ARRAY: JsonArrayAdapter = JsonArrayAdapter;
static PLATFORM_REST: PlatformRestAdapter = PlatformRestAdapter;

pub fn adapter_for(format: FeedFormat) -> &'static dyn FormatAdapter {
    match format {
        FeedFormat::MarkupFeed => &MARKUP_FEED,
        FeedFormat::JsonArray => &JSON_ARRAY,
        FeedFormat::PlatformRest => &PLATFORM_REST,
    }
}

/// Parse `body` with the adapter the source is configured for.
pub fn parse_payload(
    body: &str,
    source: &SourceDescriptor,
    now_millis: i64,
) -> Result<Vec<Item>, FormatError> {
    let t0 = std::time::Instant::now();
    let ctx = ParseContext { source, now_millis };
    let out = adapter_for(source.format).parse(body, &ctx);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms", "format" => source.format.to_string()).record(ms);
    if let Ok(items) = &out {
        counter!("feed_items_parsed_total", "source" => source.id.clone())
            .increment(items.len() as u64);
    }
    out
}

/// Raw fields pulled out of one upstream entry, before normalization.
#[derive(Debug, Default)]
pub(crate) struct RawEntry<'a> {
    pub title: Option<&'a str>,
    pub url: Option<&'a str>,
    pub published: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub hot: Option<String>,
}

/// Normalize one entry into an `Item`, or `None` when it has no usable
/// title or link.
pub(crate) fn build_item(raw: RawEntry<'_>, ctx: &ParseContext<'_>) -> Option<Item> {
    let title = normalize_title(raw.title.unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let url = raw.url.unwrap_or_default().trim();
    if url.is_empty() || url == "#" {
        return None;
    }
    let published_at_millis = raw
        .published
        .and_then(parse_published_millis)
        .unwrap_or(ctx.now_millis);

    Some(Item {
        title,
        url: url.to_string(),
        published_at_millis,
        source: ctx.source.name.clone(),
        category: ctx.source.category.clone(),
        description: raw.summary.and_then(clean_description),
        hot: raw.hot,
    })
}
