// src/ingest/providers/platform_rest.rs
use serde::Deserialize;
use serde_json::Value;

use super::{build_item, FormatAdapter, ParseContext, RawEntry};
use crate::ingest::error::FormatError;
use crate::ingest::types::{FeedFormat, Item};

const FORMAT: &str = "platform-rest";

/// `{ "rendered": "..." }` in full responses, a bare string when `_fields` trims it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Rendered {
    Object { rendered: String },
    Plain(String),
}

impl Rendered {
    fn as_str(&self) -> &str {
        match self {
            Rendered::Object { rendered } => rendered,
            Rendered::Plain(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Post {
    title: Option<Rendered>,
    link: Option<String>,
    date_gmt: Option<String>,
    date: Option<String>,
    excerpt: Option<Rendered>,
}

/// Headless-CMS listings (WordPress `wp/v2/posts` and friends).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformRestAdapter;

impl FormatAdapter for PlatformRestAdapter {
    fn format(&self) -> FeedFormat {
        FeedFormat::PlatformRest
    }

    fn parse(&self, body: &str, ctx: &ParseContext<'_>) -> Result<Vec<Item>, FormatError> {
        let posts: Vec<Value> = serde_json::from_str(body)
            .map_err(|e| FormatError::new(FORMAT, format!("expected a JSON array: {e}")))?;

        let items = posts
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Post>(v).ok())
            .filter_map(|p| {
                build_item(
                    RawEntry {
                        title: p.title.as_ref().map(Rendered::as_str),
                        url: p.link.as_deref(),
                        // date_gmt is UTC; date is site-local
                        published: p.date_gmt.as_deref().or(p.date.as_deref()),
                        summary: p.excerpt.as_ref().map(Rendered::as_str),
                        hot: None,
                    },
                    ctx,
                )
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceDescriptor;

    fn parse(body: &str) -> Result<Vec<Item>, FormatError> {
        let s = SourceDescriptor::new("uied", "UIED", "UIED", "https://x", FeedFormat::PlatformRest);
        let ctx = ParseContext {
            source: &s,
            now_millis: 1,
        };
        PlatformRestAdapter.parse(body, &ctx)
    }

    #[test]
    fn posts_map_rendered_fields() {
        let body = r#"[
          {"title":{"rendered":"Design &#8211; Weekly"},"link":"https://uied.cn/1",
           "date":"2024-01-01T18:00:00","date_gmt":"2024-01-01T10:00:00",
           "excerpt":{"rendered":"<p>Short&hellip;</p>"}},
          {"title":"Plain title","link":"https://uied.cn/2","date":"2024-01-02T00:00:00"},
          "garbage",
          {"title":{"rendered":""},"link":"https://uied.cn/3"}
        ]"#;
        let items = parse(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Design – Weekly");
        assert_eq!(items[0].published_at_millis, 1_704_103_200_000);
        assert_eq!(items[0].description.as_deref(), Some("Short…"));
        assert_eq!(items[1].title, "Plain title");
        assert!(items[1].description.is_none());
    }

    #[test]
    fn object_payload_is_format_error() {
        assert!(parse(r#"{"code":"rest_no_route"}"#).is_err());
        assert!(parse("not json").is_err());
    }
}
