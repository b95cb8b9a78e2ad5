// src/ingest/providers/markup_feed.rs
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use super::{build_item, FormatAdapter, ParseContext, RawEntry};
use crate::ingest::error::FormatError;
use crate::ingest::types::{FeedFormat, Item};

const FORMAT: &str = "markup-feed";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    updated: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins over other links.
    fn best_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.as_deref())
    }
}

/// RSS 2.0 and Atom feeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupFeedAdapter;

impl FormatAdapter for MarkupFeedAdapter {
    fn format(&self) -> FeedFormat {
        FeedFormat::MarkupFeed
    }

    fn parse(&self, body: &str, ctx: &ParseContext<'_>) -> Result<Vec<Item>, FormatError> {
        let xml_clean = scrub_html_entities_for_xml(body);
        match root_element(&xml_clean)?.as_str() {
            "rss" => parse_rss(&xml_clean, ctx),
            "feed" => parse_atom(&xml_clean, ctx),
            other => Err(FormatError::new(
                FORMAT,
                format!("unsupported root element <{other}>"),
            )),
        }
    }
}

fn parse_rss(xml: &str, ctx: &ParseContext<'_>) -> Result<Vec<Item>, FormatError> {
    let rss: Rss =
        from_str(xml).map_err(|e| FormatError::new(FORMAT, format!("rss: {e}")))?;

    let items = rss
        .channel
        .item
        .iter()
        .filter_map(|it| {
            build_item(
                RawEntry {
                    title: it.title.as_deref(),
                    url: it.link.as_deref(),
                    published: it.pub_date.as_deref().or(it.updated.as_deref()),
                    summary: it.description.as_deref(),
                    hot: None,
                },
                ctx,
            )
        })
        .collect();
    Ok(items)
}

fn parse_atom(xml: &str, ctx: &ParseContext<'_>) -> Result<Vec<Item>, FormatError> {
    let feed: AtomFeed =
        from_str(xml).map_err(|e| FormatError::new(FORMAT, format!("atom: {e}")))?;

    let items = feed
        .entry
        .iter()
        .filter_map(|e| {
            build_item(
                RawEntry {
                    title: e.title.as_deref(),
                    url: e.best_link(),
                    published: e.published.as_deref().or(e.updated.as_deref()),
                    summary: e.summary.as_deref().or(e.content.as_deref()),
                    hot: None,
                },
                ctx,
            )
        })
        .collect();
    Ok(items)
}

/// Local name of the first element, skipping the prolog.
fn root_element(xml: &str) -> Result<String, FormatError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(FormatError::new(FORMAT, "no root element")),
            Ok(_) => continue,
            Err(e) => return Err(FormatError::new(FORMAT, format!("invalid markup: {e}"))),
        }
    }
}

/// Named HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&middot;", "·")
        .replace("&copy;", "©")
}
