//! REST broker bridge.
//!
//! `GET {url}?pair=EURUSD_otc&count=50&period=60` answering either a bare
//! candle list or `{"data": [...]}`.

use crate::config::BrokerConfig;
use crate::error::{FeedError, Result};
use crate::sources::CandleSource;
use crate::types::{AssetIdentity, Candle, CandleSeries};
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

const PROBE_PAIR: &str = "EURUSD";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// 3000-01-01T00:00:00Z. Later stamps are garbage, not candles.
const MAX_EPOCH_SECS: i64 = 32_503_680_000;

/// Candle as bridges send it.
#[derive(Debug, Deserialize)]
struct WireCandle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(alias = "timestamp", alias = "from")]
    time: WireTime,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTime {
    Epoch(f64),
    Text(String),
}

impl WireTime {
    /// Unix seconds. Millisecond epochs are scaled down; stamps before 1970
    /// or after year 3000 are rejected.
    fn to_unix(&self) -> Option<i64> {
        let secs = match self {
            WireTime::Epoch(value) if value.is_finite() => {
                let secs = if *value > 1e11 { *value / 1000.0 } else { *value };
                if !(0.0..=MAX_EPOCH_SECS as f64).contains(&secs) {
                    return None;
                }
                secs as i64
            }
            WireTime::Epoch(_) => return None,
            WireTime::Text(text) => NaiveDateTime::parse_from_str(text.trim(), TIME_FORMAT)
                .ok()
                .map(|dt| dt.and_utc().timestamp())
                .or_else(|| text.trim().parse::<i64>().ok())?,
        };
        (0..=MAX_EPOCH_SECS).contains(&secs).then_some(secs)
    }
}

/// Parse a bridge payload into a series.
///
/// Accepts a list or an object with a `data` or `candles` list. Entries that
/// fail to parse are skipped individually.
pub fn parse_candles(payload: &Value) -> Result<CandleSeries> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("data").or_else(|| map.get("candles")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FeedError::MalformedPayload(
                    "expected a candle list".to_string(),
                ))
            }
        },
        _ => {
            return Err(FeedError::MalformedPayload(
                "expected a candle list".to_string(),
            ))
        }
    };

    let candles: Vec<Candle> = items
        .iter()
        .filter_map(|item| {
            let wire: WireCandle = serde_json::from_value(item.clone()).ok()?;
            let timestamp = wire.time.to_unix()?;
            Some(Candle::new(wire.open, wire.high, wire.low, wire.close, timestamp))
        })
        .collect();

    if items.len() != candles.len() {
        debug!("Dropped {} unparseable candles", items.len() - candles.len());
    }

    Ok(CandleSeries::from_unordered(candles))
}

/// HTTP broker bridge.
pub struct HttpBridge {
    config: BrokerConfig,
    client: Client,
    connected: AtomicBool,
}

impl HttpBridge {
    pub fn new(config: BrokerConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            config,
            client,
            connected: AtomicBool::new(false),
        }
    }

    async fn request(
        &self,
        pair: &str,
        timeframe_secs: i64,
        count: usize,
        timeout: Duration,
    ) -> Result<CandleSeries> {
        let mut request = self
            .client
            .get(&self.config.url)
            .query(&[
                ("pair", pair.to_string()),
                ("count", count.to_string()),
                ("period", timeframe_secs.to_string()),
            ])
            .timeout(timeout);

        if let Some(ref token) = self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FeedError::SourceUnavailable(format!(
                "{} bridge returned {}",
                self.config.name,
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        parse_candles(&payload)
    }
}

#[async_trait::async_trait]
impl CandleSource for HttpBridge {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<()> {
        match self.request(PROBE_PAIR, 60, 1, PROBE_TIMEOUT).await {
            Ok(_) => {
                self.connected.store(true, Ordering::Relaxed);
                info!("{} HTTP bridge connected at {}", self.config.name, self.config.url);
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::Relaxed);
                warn!("{} HTTP bridge probe failed: {}", self.config.name, e);
                Err(e)
            }
        }
    }

    async fn fetch_candles(
        &self,
        asset: &AssetIdentity,
        timeframe_secs: i64,
        count: usize,
    ) -> Result<CandleSeries> {
        if !self.is_connected() {
            return Err(FeedError::SourceUnavailable(format!(
                "{} not connected",
                self.config.name
            )));
        }

        let series = self
            .request(&asset.bridge_pair(), timeframe_secs, count, REQUEST_TIMEOUT)
            .await?;
        debug!(
            "{} returned {} candles for {}",
            self.config.name,
            series.len(),
            asset
        );
        Ok(series)
    }
}
