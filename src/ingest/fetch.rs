// src/ingest/fetch.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::ingest::error::NetworkError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_ACCEPT: &str =
    "application/json, application/xml, text/xml, application/rss+xml, */*";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Headers sent with every upstream request unless a source overrides them.
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Accept".to_string(), DEFAULT_ACCEPT.to_string()),
        ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        ("Cache-Control".to_string(), "no-cache".to_string()),
        ("Pragma".to_string(), "no-cache".to_string()),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

/// One bounded-time GET returning the raw body. No retries, no caching.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<String, NetworkError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<String, NetworkError> {
        let mut builder = self.client.get(&req.url).timeout(req.timeout);
        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| classify(e, req.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url: req.url.clone(),
            });
        }

        let body = resp.text().await.map_err(|e| classify(e, req.timeout))?;
        if body.trim().is_empty() {
            return Err(NetworkError::EmptyBody);
        }
        Ok(body)
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout(timeout)
    } else {
        NetworkError::Transport(e.to_string())
    }
}

/// Prefix relative endpoints with `base_url`; absolute ones pass through.
pub fn resolve_url(endpoint: &str, base_url: Option<&str>) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    match base_url {
        Some(base) => {
            let base = base.trim_end_matches('/');
            if endpoint.starts_with('/') {
                format!("{base}{endpoint}")
            } else {
                format!("{base}/{endpoint}")
            }
        }
        None => endpoint.to_string(),
    }
}

/// Defaults first, then source headers; a source header replaces a default
/// with the same (case-insensitive) name.
pub fn merge_headers(
    defaults: &[(String, String)],
    overrides: &std::collections::BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = defaults
        .iter()
        .filter(|(k, _)| !overrides.keys().any(|o| o.eq_ignore_ascii_case(k)))
        .cloned()
        .collect();
    out.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}
