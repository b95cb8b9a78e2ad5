// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::SourceDescriptor;

pub const ENV_SOURCES_PATH: &str = "FEEDHUB_SOURCES_PATH";

/// Load source descriptors from an explicit path. Supports TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load sources using env var + fallbacks:
/// 1) $FEEDHUB_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<SourceDescriptor>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

pub fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<SourceDescriptor>> {
    if hint_ext == "toml" {
        return parse_toml(s);
    }
    if hint_ext == "json" {
        return parse_json(s);
    }
    parse_json(s).or_else(|json_err| {
        parse_toml(s).map_err(|toml_err| {
            anyhow!("unsupported sources format (json: {json_err}; toml: {toml_err})")
        })
    })
}

#[derive(serde::Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<SourceDescriptor>,
}

fn parse_toml(s: &str) -> Result<Vec<SourceDescriptor>> {
    let v: SourcesFile = toml::from_str(s)?;
    Ok(v.sources)
}

/// A bare array or `{ "sources": [...] }`.
fn parse_json(s: &str) -> Result<Vec<SourceDescriptor>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum JsonSources {
        List(Vec<SourceDescriptor>),
        Wrapped(SourcesFile),
    }
    let v: JsonSources = serde_json::from_str(s)?;
    Ok(match v {
        JsonSources::List(l) => l,
        JsonSources::Wrapped(w) => w.sources,
    })
}

/// Reject configurations the aggregator cannot serve: blank or duplicate ids,
/// blank names/categories, relative endpoints without a base URL.
pub fn validate_sources(sources: &[SourceDescriptor], base_url: Option<&str>) -> Result<()> {
    let mut ids = HashSet::new();
    for s in sources {
        if s.id.trim().is_empty() {
            bail!("source with empty id (name: {:?})", s.name);
        }
        if !ids.insert(s.id.as_str()) {
            bail!("duplicate source id {:?}", s.id);
        }
        if s.name.trim().is_empty() || s.category.trim().is_empty() {
            bail!("source {:?} needs a name and a category", s.id);
        }
        if s.endpoint.trim().is_empty() {
            bail!("source {:?} has an empty endpoint", s.id);
        }
        if !s.is_absolute() && base_url.is_none() {
            bail!(
                "source {:?} has relative endpoint {:?} but no base URL is configured",
                s.id,
                s.endpoint
            );
        }
    }
    Ok(())
}
