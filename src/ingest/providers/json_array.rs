// src/ingest/providers/json_array.rs
use serde_json::Value;

use super::{build_item, FormatAdapter, ParseContext, RawEntry};
use crate::ingest::error::FormatError;
use crate::ingest::types::{FeedFormat, Item};

const FORMAT: &str = "json-array";
const OK_CODE: u64 = 200;

/// Hot-ranking APIs: `{ "code": 200, "data": [...] }`, where `data` may also be
/// `{ "list": [...] }` or `{ "items": [...] }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArrayAdapter;

impl FormatAdapter for JsonArrayAdapter {
    fn format(&self) -> FeedFormat {
        FeedFormat::JsonArray
    }

    fn parse(&self, body: &str, ctx: &ParseContext<'_>) -> Result<Vec<Item>, FormatError> {
        let root: Value = serde_json::from_str(body)
            .map_err(|e| FormatError::new(FORMAT, format!("invalid JSON: {e}")))?;
        let obj = root
            .as_object()
            .ok_or_else(|| FormatError::new(FORMAT, "expected a JSON object"))?;

        let code = obj.get("code").and_then(Value::as_u64);
        if code != Some(OK_CODE) {
            tracing::warn!(
                source = %ctx.source.id,
                code = ?obj.get("code"),
                msg = ?obj.get("msg"),
                "upstream returned non-OK status code"
            );
            return Ok(Vec::new());
        }

        let Some(list) = obj.get("data").and_then(unwrap_list) else {
            tracing::warn!(source = %ctx.source.id, "data field is not a list");
            return Ok(Vec::new());
        };

        let items = list
            .iter()
            .filter_map(|entry| {
                let title = first_text(entry, &["title", "name", "desc"], "text");
                let url = first_text(entry, &["mobileUrl", "url", "link"], "url");
                let hot = first_scalar(entry, &["hot", "views", "score", "num", "count"])
                    .unwrap_or_else(|| "-".to_string());
                build_item(
                    RawEntry {
                        title: title.as_deref(),
                        url: url.as_deref(),
                        published: None,
                        summary: None,
                        hot: Some(hot),
                    },
                    ctx,
                )
            })
            .collect();
        Ok(items)
    }
}

fn unwrap_list(data: &Value) -> Option<&Vec<Value>> {
    match data {
        Value::Array(a) => Some(a),
        Value::Object(o) => o
            .get("list")
            .or_else(|| o.get("items"))
            .and_then(Value::as_array),
        _ => None,
    }
}

/// First non-empty string among `keys`; `{ <wrapper>: "..." }` objects are unwrapped.
fn first_text(entry: &Value, keys: &[&str], wrapper: &str) -> Option<String> {
    keys.iter().find_map(|k| {
        let v = entry.get(*k)?;
        let s = match v {
            Value::String(s) => s.as_str(),
            Value::Object(o) => o.get(wrapper)?.as_str()?,
            _ => return None,
        };
        (!s.trim().is_empty()).then(|| s.to_string())
    })
}

/// First truthy popularity value; numbers are rendered as-is.
fn first_scalar(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match entry.get(*k)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Object(o) => o.get("text")?.as_str().map(str::to_string),
        _ => None,
    })
}
