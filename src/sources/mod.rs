//! Market data sources.
//!
//! Broker bridges implement [`CandleSource`]; the external quote API and the
//! tick stream have their own clients because the feed treats them as
//! separate waterfall steps.

pub mod alphavantage;
pub mod http_bridge;
pub mod tick_stream;
pub mod ws_bridge;

pub use alphavantage::AlphaVantageClient;
pub use http_bridge::HttpBridge;
pub use tick_stream::TickStream;
pub use ws_bridge::WsBridge;

use crate::config::{BridgeKind, BrokerConfig};
use crate::error::Result;
use crate::types::{AssetIdentity, CandleSeries};
use std::sync::Arc;

/// Capability shared by every broker bridge.
///
/// `fetch_candles` must fail fast with `SourceUnavailable` when the bridge
/// is not connected and must never block past the caller's timeout.
#[async_trait::async_trait]
pub trait CandleSource: Send + Sync {
    /// Broker name, e.g. `QUOTEX`.
    fn name(&self) -> &str;

    /// Transport label for status reporting.
    fn kind(&self) -> &'static str;

    fn is_connected(&self) -> bool;

    /// One connection/handshake attempt.
    async fn connect(&self) -> Result<()>;

    /// Fetch recent candles, oldest first.
    async fn fetch_candles(
        &self,
        asset: &AssetIdentity,
        timeframe_secs: i64,
        count: usize,
    ) -> Result<CandleSeries>;
}

/// Build the configured broker bridges in registration order.
pub fn build_bridges(brokers: &[BrokerConfig]) -> Vec<Arc<dyn CandleSource>> {
    brokers
        .iter()
        .map(|broker| -> Arc<dyn CandleSource> {
            match broker.kind {
                BridgeKind::Http => Arc::new(HttpBridge::new(broker.clone())),
                BridgeKind::Ws => Arc::new(WsBridge::new(broker.clone())),
            }
        })
        .collect()
}
