use crate::services::feed::MarketDataFeed;
use crate::services::recorder::SignalRecorder;
use crate::types::SourceStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Periodic source health report.
pub struct Heartbeat {
    feed: Arc<MarketDataFeed>,
    recorder: Arc<dyn SignalRecorder>,
    instance_id: String,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(
        feed: Arc<MarketDataFeed>,
        recorder: Arc<dyn SignalRecorder>,
        instance_id: String,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            recorder,
            instance_id,
            interval,
        }
    }

    /// Run [`beat`](Self::beat) every `interval` until the task is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.beat().await;
            }
        })
    }

    /// One heartbeat: snapshot sources, prune the cache and report.
    pub async fn beat(&self) -> Vec<SourceStatus> {
        let statuses = self.feed.status().await;
        self.feed.cleanup_cache();

        let online = statuses.iter().filter(|s| s.connected).count();
        info!(
            "Heartbeat [{}]: {}/{} sources online, {} cached series",
            self.instance_id,
            online,
            statuses.len(),
            self.feed.cached_entries()
        );

        let recorder = Arc::clone(&self.recorder);
        let instance_id = self.instance_id.clone();
        let snapshot = statuses.clone();
        tokio::task::spawn_blocking(move || recorder.record_status(&instance_id, &snapshot));

        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;
    use crate::services::recorder::LogRecorder;

    #[tokio::test]
    async fn test_beat_without_sources() {
        let feed = Arc::new(MarketDataFeed::with_sources(
            FeedConfig::default(),
            None,
            None,
            Vec::new(),
        ));
        let heartbeat = Heartbeat::new(
            feed,
            Arc::new(LogRecorder),
            "local".to_string(),
            Duration::from_secs(60),
        );
        assert!(heartbeat.beat().await.is_empty());
    }
}
