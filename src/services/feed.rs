use crate::config::{Config, FeedConfig};
use crate::error::{FeedError, Result};
use crate::services::cache::Cache;
use crate::services::synthetic;
use crate::sources::{build_bridges, AlphaVantageClient, CandleSource, TickStream};
use crate::types::{
    AssetIdentity, Candle, CandleSeries, DataSource, SourceStatus, SourcedSeries, Timeframe,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Multi-source candle feed.
///
/// Resolution order on a cache miss:
/// 1. Alpha Vantage, then the tick stream (real markets only).
/// 2. The broker hint, the preferred bridge, then the remaining bridges in
///    registration order.
/// 3. The deterministic synthetic generator, which cannot fail.
///
/// Every step is bounded by `fetch_timeout` and any failure moves on to the
/// next step. The winning series is cached with its source's TTL.
pub struct MarketDataFeed {
    config: FeedConfig,
    cache: Cache<SourcedSeries>,
    alpha_vantage: Option<AlphaVantageClient>,
    tick_stream: Option<TickStream>,
    adapters: Vec<Arc<dyn CandleSource>>,
    preferred: RwLock<Option<String>>,
}

impl MarketDataFeed {
    /// Build a feed from application configuration.
    pub fn new(config: &Config) -> Arc<Self> {
        let alpha_vantage = config.alpha_vantage.clone().map(AlphaVantageClient::new);
        let tick_stream = config.tick_stream.clone().map(TickStream::new);
        let adapters = build_bridges(&config.brokers);

        info!(
            "Market data feed: alphavantage={} tick_stream={} bridges={}",
            alpha_vantage.is_some(),
            tick_stream.is_some(),
            adapters.len()
        );

        Arc::new(Self::with_sources(
            config.feed.clone(),
            alpha_vantage,
            tick_stream,
            adapters,
        ))
    }

    /// Build a feed from explicit sources.
    pub fn with_sources(
        config: FeedConfig,
        alpha_vantage: Option<AlphaVantageClient>,
        tick_stream: Option<TickStream>,
        adapters: Vec<Arc<dyn CandleSource>>,
    ) -> Self {
        Self {
            cache: Cache::new(),
            config,
            alpha_vantage,
            tick_stream,
            adapters,
            preferred: RwLock::new(None),
        }
    }

    /// Start the tick stream and background bridge connection.
    pub async fn start(self: &Arc<Self>) {
        if let Some(ref ticks) = self.tick_stream {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                if let Err(e) = ticks.connect().await {
                    error!("Tick stream error: {}", e);
                }
            });
        }

        self.connect_adapters();
    }

    /// Spawn one connection task per bridge.
    ///
    /// Each task makes up to `connect_retries` attempts `connect_retry_delay`
    /// apart. The first bridge to connect becomes the preferred one.
    pub fn connect_adapters(self: &Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        self.adapters
            .iter()
            .cloned()
            .map(|adapter| {
                let feed = Arc::clone(self);
                tokio::spawn(async move { feed.connect_with_retry(adapter).await })
            })
            .collect()
    }

    async fn connect_with_retry(&self, adapter: Arc<dyn CandleSource>) {
        let attempts = self.config.connect_retries.max(1);
        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(self.config.fetch_timeout, adapter.connect()).await;
            match outcome {
                Ok(Ok(())) => {
                    self.promote(adapter.name()).await;
                    return;
                }
                Ok(Err(e)) => {
                    warn!(
                        "{} connect attempt {}/{} failed: {}",
                        adapter.name(),
                        attempt,
                        attempts,
                        e
                    );
                }
                Err(_) => {
                    warn!(
                        "{} connect attempt {}/{} timed out",
                        adapter.name(),
                        attempt,
                        attempts
                    );
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.connect_retry_delay).await;
            }
        }
        warn!("{} unavailable, continuing without it", adapter.name());
    }

    /// Make `name` the preferred bridge unless one is already set.
    async fn promote(&self, name: &str) {
        let mut preferred = self.preferred.write().await;
        if preferred.is_none() {
            info!("{} is now the preferred bridge", name);
            *preferred = Some(name.to_string());
        }
    }

    pub async fn preferred(&self) -> Option<String> {
        self.preferred.read().await.clone()
    }

    /// Closed candles for `asset`. Never empty.
    pub async fn get_candles(&self, asset: &AssetIdentity, timeframe: Timeframe) -> CandleSeries {
        self.get_candles_with_hint(asset, timeframe, None).await.series
    }

    /// Closed candles plus the source that produced them.
    ///
    /// A `broker_hint` naming a configured bridge moves it to the front of
    /// the bridge step.
    pub async fn get_candles_with_hint(
        &self,
        asset: &AssetIdentity,
        timeframe: Timeframe,
        broker_hint: Option<&str>,
    ) -> SourcedSeries {
        let key = format!("{}:{}", asset.cache_key(), timeframe.minutes());
        self.cache
            .get_or_load(&key, || self.resolve(asset, timeframe, broker_hint))
            .await
    }

    async fn resolve(
        &self,
        asset: &AssetIdentity,
        timeframe: Timeframe,
        broker_hint: Option<&str>,
    ) -> (SourcedSeries, Duration) {
        let tf = timeframe.seconds();
        let now = chrono::Utc::now().timestamp();

        if !asset.is_otc {
            if let Some(ref client) = self.alpha_vantage {
                if AlphaVantageClient::supports(asset) {
                    let fetched = self
                        .attempt("alphavantage", client.fetch_candles(asset, tf, now))
                        .await;
                    if let Some(series) = closed_only(fetched, &DataSource::ExternalApi, tf, now) {
                        return self.finish(asset, series, DataSource::ExternalApi, self.config.external_ttl);
                    }
                }
            }

            if let Some(series) = self.tick_candle(asset, tf, now) {
                return self.finish(asset, series, DataSource::TickStream, self.config.tick_ttl);
            }
        }

        for adapter in self.adapter_order(broker_hint).await {
            let source = DataSource::Broker(adapter.name().to_string());
            let fetched = self
                .attempt(
                    adapter.name(),
                    adapter.fetch_candles(asset, tf, self.config.candle_count),
                )
                .await;
            if let Some(series) = closed_only(fetched, &source, tf, now) {
                let series = series.tail(self.config.candle_count);
                return self.finish(asset, series, source, self.config.broker_ttl);
            }
        }

        let series = synthetic::generate(asset, tf, self.config.synthetic_candles, now);
        let ttl = Duration::from_secs(synthetic::secs_until_next_minute(now));
        self.finish(asset, series, DataSource::Synthetic, ttl)
    }

    fn finish(
        &self,
        asset: &AssetIdentity,
        series: CandleSeries,
        source: DataSource,
        ttl: Duration,
    ) -> (SourcedSeries, Duration) {
        debug!(
            "{}: {} candles from {} (ttl {}s)",
            asset,
            series.len(),
            source,
            ttl.as_secs()
        );
        (SourcedSeries::new(series, source), ttl)
    }

    /// Run one waterfall step under the fetch timeout; every failure is `None`.
    async fn attempt<F>(&self, source_name: &str, fetch: F) -> Option<CandleSeries>
    where
        F: Future<Output = Result<CandleSeries>>,
    {
        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(series)) => Some(series),
            Ok(Err(e)) => {
                debug!("{} step failed: {}", source_name, e);
                None
            }
            Err(_) => {
                let e = FeedError::Timeout {
                    source_name: source_name.to_string(),
                    secs: self.config.fetch_timeout.as_secs(),
                };
                warn!("{}", e);
                None
            }
        }
    }

    /// Single-point candle from a fresh tick, stamped at the current slot.
    fn tick_candle(&self, asset: &AssetIdentity, tf: i64, now: i64) -> Option<CandleSeries> {
        let ticks = self.tick_stream.as_ref()?;
        if !ticks.is_connected() {
            return None;
        }
        let price = ticks.latest_price(asset, now)?;
        let slot = now.div_euclid(tf) * tf;
        Some(CandleSeries::from_unordered(vec![Candle::flat(price, slot)]))
    }

    /// Hint first, then the preferred bridge, then registration order.
    async fn adapter_order(&self, broker_hint: Option<&str>) -> Vec<Arc<dyn CandleSource>> {
        let preferred = self.preferred().await;
        let mut ordered: Vec<Arc<dyn CandleSource>> = Vec::with_capacity(self.adapters.len());

        let leaders = [broker_hint.map(str::to_string), preferred];
        for name in leaders.iter().flatten() {
            if let Some(adapter) = self
                .adapters
                .iter()
                .find(|a| a.name().eq_ignore_ascii_case(name))
            {
                if !ordered.iter().any(|o| Arc::ptr_eq(o, adapter)) {
                    ordered.push(Arc::clone(adapter));
                }
            }
        }
        for adapter in &self.adapters {
            if !ordered.iter().any(|o| Arc::ptr_eq(o, adapter)) {
                ordered.push(Arc::clone(adapter));
            }
        }
        ordered
    }

    /// Connectivity snapshot of every configured source.
    pub async fn status(&self) -> Vec<SourceStatus> {
        let preferred = self.preferred().await;
        let mut statuses = Vec::new();

        if self.alpha_vantage.is_some() {
            statuses.push(SourceStatus {
                name: "alphavantage".to_string(),
                kind: "external".to_string(),
                connected: true,
                preferred: false,
            });
        }
        if let Some(ref ticks) = self.tick_stream {
            statuses.push(SourceStatus {
                name: "tick_stream".to_string(),
                kind: "ws".to_string(),
                connected: ticks.is_connected(),
                preferred: false,
            });
        }
        for adapter in &self.adapters {
            statuses.push(SourceStatus {
                name: adapter.name().to_string(),
                kind: adapter.kind().to_string(),
                connected: adapter.is_connected(),
                preferred: preferred.as_deref() == Some(adapter.name()),
            });
        }
        statuses
    }

    /// Drop expired cache entries.
    pub fn cleanup_cache(&self) {
        self.cache.cleanup();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// Apply the forming-candle policy; an emptied series counts as a failure.
fn closed_only(
    fetched: Option<CandleSeries>,
    source: &DataSource,
    tf: i64,
    now: i64,
) -> Option<CandleSeries> {
    let series = fetched?;
    let series = if source.has_forming_candle() {
        series.without_forming(tf, now)
    } else {
        series
    };
    (!series.is_empty()).then_some(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_only_drops_forming_for_brokers() {
        let series = CandleSeries::from_unordered(vec![Candle::flat(1.0, 0), Candle::flat(1.0, 60)]);
        let kept = closed_only(
            Some(series.clone()),
            &DataSource::Broker("QUOTEX".into()),
            60,
            100,
        )
        .unwrap();
        assert_eq!(kept.len(), 1);

        let tick = closed_only(Some(series), &DataSource::TickStream, 60, 100).unwrap();
        assert_eq!(tick.len(), 2);
    }

    #[test]
    fn test_closed_only_empty_is_failure() {
        let forming = CandleSeries::from_unordered(vec![Candle::flat(1.0, 60)]);
        assert!(closed_only(Some(forming), &DataSource::ExternalApi, 60, 90).is_none());
        assert!(closed_only(None, &DataSource::ExternalApi, 60, 90).is_none());
    }

    #[tokio::test]
    async fn test_no_sources_falls_back_to_synthetic() {
        let feed = MarketDataFeed::with_sources(FeedConfig::default(), None, None, Vec::new());
        let asset = AssetIdentity::parse("EUR/USD").unwrap();
        let result = feed.get_candles_with_hint(&asset, Timeframe::M1, None).await;
        assert_eq!(result.source, DataSource::Synthetic);
        assert_eq!(result.series.len(), 60);
        assert_eq!(feed.cached_entries(), 1);
        assert!(feed.status().await.is_empty());
    }
}
