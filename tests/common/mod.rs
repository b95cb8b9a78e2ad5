// tests/common/mod.rs
//
// Scripted in-memory fetcher + payload builders shared by integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use feedhub::ingest::error::NetworkError;
use feedhub::ingest::fetch::{FetchRequest, Fetcher};
use feedhub::ingest::service::PageLimits;
use feedhub::ingest::types::{FeedFormat, SourceDescriptor};
use feedhub::ingest::{AggregatorSettings, FeedService};

type Reply = Result<String, NetworkError>;

#[derive(Default)]
struct Script {
    queue: VecDeque<Reply>,
    last: Option<Reply>,
    delay: Duration,
}

/// Replies are consumed in order; the final reply repeats forever.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
    seen_headers: Mutex<Vec<(String, String)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn always(&self, url: &str, reply: Reply) {
        self.sequence(url, vec![reply]);
    }

    pub fn sequence(&self, url: &str, replies: Vec<Reply>) {
        let mut scripts = self.scripts.lock().unwrap();
        let s = scripts.entry(url.to_string()).or_default();
        s.queue = replies.into_iter().collect();
        s.last = None;
    }

    pub fn set_delay(&self, url: &str, delay: Duration) {
        let mut scripts = self.scripts.lock().unwrap();
        scripts.entry(url.to_string()).or_default().delay = delay;
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn last_headers(&self) -> Vec<(String, String)> {
        self.seen_headers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<String, NetworkError> {
        *self.calls.lock().unwrap().entry(req.url.clone()).or_default() += 1;
        *self.seen_headers.lock().unwrap() = req.headers.clone();

        let (reply, delay) = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&req.url) {
                Some(s) => {
                    let reply = match s.queue.pop_front() {
                        Some(r) => {
                            s.last = Some(r.clone());
                            r
                        }
                        None => s
                            .last
                            .clone()
                            .unwrap_or_else(|| Err(NetworkError::Transport("no script".into()))),
                    };
                    (reply, s.delay)
                }
                None => (
                    Err(NetworkError::Transport(format!("unscripted url {}", req.url))),
                    Duration::ZERO,
                ),
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

pub fn settings(ttl: Duration) -> AggregatorSettings {
    AggregatorSettings {
        ttl,
        fetch_timeout: Duration::from_secs(1),
        ..AggregatorSettings::default()
    }
}

pub fn service(
    fetcher: Arc<ScriptedFetcher>,
    ttl: Duration,
    sources: Vec<SourceDescriptor>,
) -> Arc<FeedService> {
    FeedService::shared(fetcher, settings(ttl), sources, PageLimits::default())
}

/// Source with a 1 ms retry step so retry budgets stay short in tests.
pub fn source(id: &str, category: &str, format: FeedFormat) -> SourceDescriptor {
    SourceDescriptor::new(id, id.to_uppercase(), category, url_of(id), format).with_retry(2, 1)
}

pub fn url_of(id: &str) -> String {
    format!("https://{id}.test/feed")
}

pub fn rss(items: &[(&str, &str, &str)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, link, date)| {
            format!(
                "<item><title>{title}</title><link>{link}</link><pubDate>{date}</pubDate>\
                 <description><![CDATA[<p>{title} summary</p>]]></description></item>"
            )
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>{body}</channel></rss>"#)
}

pub fn dailyhot(items: &[(&str, &str)]) -> String {
    let data: Vec<serde_json::Value> = items
        .iter()
        .map(|(title, url)| serde_json::json!({ "title": title, "url": url, "hot": 100 }))
        .collect();
    serde_json::json!({ "code": 200, "msg": "ok", "data": data }).to_string()
}

pub fn wp_posts(items: &[(&str, &str, &str)]) -> String {
    let data: Vec<serde_json::Value> = items
        .iter()
        .map(|(title, link, date_gmt)| {
            serde_json::json!({
                "title": { "rendered": title },
                "link": link,
                "date_gmt": date_gmt,
                "excerpt": { "rendered": format!("<p>{title}</p>") }
            })
        })
        .collect();
    serde_json::Value::Array(data).to_string()
}

pub fn titles(items: &[feedhub::Item]) -> Vec<String> {
    items.iter().map(|i| i.title.clone()).collect()
}
