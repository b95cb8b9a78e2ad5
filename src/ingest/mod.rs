// src/ingest/mod.rs
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod providers;
pub mod retry;
pub mod scheduler;
pub mod service;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

pub use aggregator::{Aggregator, AggregatorSettings, LastError};
pub use service::{FeedService, ItemQuery};
pub use types::{FeedFormat, Item, SourceDescriptor, ViewKey};

/// Descriptions are capped to this many characters before the ellipsis.
pub const DESCRIPTION_MAX_CHARS: usize = 150;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Upstream fetch attempts.");
        describe_counter!(
            "feed_fetch_errors_total",
            "Sources that failed after exhausting retries or on unreadable payloads."
        );
        describe_counter!("feed_retries_total", "Retries scheduled after a failed attempt.");
        describe_counter!(
            "feed_cache_hits_total",
            "Source or view reads served from a fresh cache entry."
        );
        describe_counter!(
            "feed_stale_served_total",
            "Failed sources answered from their last known data."
        );
        describe_counter!("feed_items_parsed_total", "Items produced by format adapters.");
        describe_histogram!("feed_parse_ms", "Adapter parse time in milliseconds.");
        describe_counter!("feed_refresh_runs_total", "Background refresh cycles completed.");
        describe_gauge!(
            "feed_refresh_last_run_ts",
            "Unix ts when the refresh scheduler last ran a cycle."
        );
    });
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").expect("static regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn re_script_style() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("static regex")
    })
}

fn collapse_ws(s: &str) -> String {
    re_ws().replace_all(s, " ").trim().to_string()
}

/// Titles: decode entities, drop tags, collapse whitespace.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let no_tags = re_tags().replace_all(&decoded, " ");
    collapse_ws(&no_tags)
}

/// Summaries: drop script/style blocks entirely, strip remaining tags, decode
/// entities, collapse whitespace, cap at `DESCRIPTION_MAX_CHARS` + "...".
/// Returns `None` when nothing readable is left.
pub fn clean_description(s: &str) -> Option<String> {
    let out = re_script_style().replace_all(s, " ");
    let out = re_tags().replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out);
    let out = collapse_ws(&out);
    if out.is_empty() {
        return None;
    }
    if out.chars().count() > DESCRIPTION_MAX_CHARS {
        let mut capped: String = out.chars().take(DESCRIPTION_MAX_CHARS).collect();
        capped.push_str("...");
        return Some(capped);
    }
    Some(out)
}

/// RFC 2822 (RSS), RFC 3339 (Atom), or offset-less ISO (WordPress, read as UTC).
pub fn parse_published_millis(ts: &str) -> Option<i64> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    let from_time = |dt: OffsetDateTime| i64::try_from(dt.unix_timestamp_nanos() / 1_000_000).ok();

    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return from_time(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc3339) {
        return from_time(dt);
    }
    // obsolete zone names ("GMT", "EST") that `time` rejects
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(ts) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(ts, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    None
}
