// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, gauge};
use tokio::task::JoinHandle;

use crate::ingest::service::FeedService;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval: Duration,
}

impl Default for RefreshSchedulerCfg {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Spawn the background refresh loop. Each tick spawns its own cycle, so a
/// slow cycle never delays the next tick and cycles may overlap.
pub fn spawn_refresh_scheduler(service: Arc<FeedService>, cfg: RefreshSchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = cfg.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticker.tick().await;
            let svc = service.clone();
            tokio::spawn(async move {
                refresh_all(&svc).await;
            });
        }
    })
}

/// Force-refresh every remembered view once. Failures are logged inside the
/// aggregator and never surface here. Returns the number of views refreshed.
pub async fn refresh_all(service: &FeedService) -> usize {
    let views = service.known_views();
    let now = chrono::Utc::now().timestamp().max(0);

    let counts = join_all(views.iter().map(|v| service.refresh_view(v))).await;

    counter!("feed_refresh_runs_total").increment(1);
    gauge!("feed_refresh_last_run_ts").set(now as f64);

    tracing::info!(
        target: "refresh",
        views = views.len(),
        items = counts.iter().sum::<usize>(),
        "refresh cycle done"
    );
    views.len()
}
