//! Alpha Vantage API client for intraday forex, crypto and metal quotes.
//!
//! Note: Free tier has very limited rate limits (25 requests/day, 5/minute),
//! so requests inside the configured minimum interval fail locally.

use crate::config::AlphaVantageConfig;
use crate::error::{FeedError, Result};
use crate::types::{AssetIdentity, Candle, CandleSeries};
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_POINTS: usize = 50;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ERROR_KEYS: &[&str] = &["Error Message", "Note", "Information"];
const CRYPTO_BASES: &[&str] = &["BTC", "ETH", "LTC", "XRP", "SOL"];
const METAL_BASES: &[&str] = &["XAU", "XAG"];

/// Individual intraday data point.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesDataPoint {
    #[serde(rename = "1. open")]
    pub open: String,
    #[serde(rename = "2. high")]
    pub high: String,
    #[serde(rename = "3. low")]
    pub low: String,
    #[serde(rename = "4. close")]
    pub close: String,
}

/// Realtime exchange rate response.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    pub rate: Option<ExchangeRate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRate {
    #[serde(rename = "1. From_Currency Code")]
    pub from: Option<String>,
    #[serde(rename = "3. To_Currency Code")]
    pub to: Option<String>,
    #[serde(rename = "5. Exchange Rate")]
    pub rate: String,
}

/// Which endpoint serves an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    FxIntraday,
    CryptoIntraday,
    ExchangeRate,
}

impl Endpoint {
    /// Pick the endpoint for a real (non-OTC) six-letter pair.
    pub fn for_asset(asset: &AssetIdentity) -> Option<Self> {
        if asset.is_otc {
            return None;
        }
        let (base, quote) = asset.currency_pair()?;
        if METAL_BASES.contains(&base) {
            Some(Endpoint::ExchangeRate)
        } else if CRYPTO_BASES.contains(&base) && quote == "USD" {
            Some(Endpoint::CryptoIntraday)
        } else {
            Some(Endpoint::FxIntraday)
        }
    }
}

/// Alpha Vantage interval string for a timeframe, falling back to `1min`.
fn interval(timeframe_secs: i64) -> &'static str {
    match timeframe_secs / 60 {
        5 => "5min",
        15 => "15min",
        30 => "30min",
        60 => "60min",
        _ => "1min",
    }
}

/// Alpha Vantage API client.
pub struct AlphaVantageClient {
    client: Client,
    config: AlphaVantageConfig,
    last_request: Mutex<Option<Instant>>,
}

impl AlphaVantageClient {
    /// Create a new Alpha Vantage client.
    pub fn new(config: AlphaVantageConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Whether this source can quote `asset` at all.
    pub fn supports(asset: &AssetIdentity) -> bool {
        Endpoint::for_asset(asset).is_some()
    }

    /// Reserve a request slot or fail with `RateLimited`.
    async fn acquire_slot(&self) -> Result<()> {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.config.min_interval {
                return Err(FeedError::RateLimited(format!(
                    "alphavantage: next request in {}ms",
                    (self.config.min_interval - elapsed).as_millis()
                )));
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }

    async fn get_json(&self, params: &[(&str, String)]) -> Result<Value> {
        self.acquire_slot().await?;

        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("apikey", self.config.api_key.clone()));

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::ExternalApi(format!(
                "API error: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        check_error_payload(&payload)?;
        Ok(payload)
    }

    /// Fetch recent candles for a real-market asset.
    pub async fn fetch_candles(
        &self,
        asset: &AssetIdentity,
        timeframe_secs: i64,
        now: i64,
    ) -> Result<CandleSeries> {
        let endpoint = Endpoint::for_asset(asset).ok_or_else(|| {
            FeedError::SourceUnavailable(format!("alphavantage does not quote {}", asset))
        })?;
        let (base, quote) = asset.currency_pair().ok_or_else(|| {
            FeedError::SourceUnavailable(format!("alphavantage does not quote {}", asset))
        })?;

        let series = match endpoint {
            Endpoint::FxIntraday => {
                let payload = self
                    .get_json(&[
                        ("function", "FX_INTRADAY".to_string()),
                        ("from_symbol", base.to_string()),
                        ("to_symbol", quote.to_string()),
                        ("interval", interval(timeframe_secs).to_string()),
                        ("outputsize", "compact".to_string()),
                    ])
                    .await?;
                parse_intraday(&payload)?
            }
            Endpoint::CryptoIntraday => {
                let payload = self
                    .get_json(&[
                        ("function", "CRYPTO_INTRADAY".to_string()),
                        ("symbol", base.to_string()),
                        ("market", quote.to_string()),
                        ("interval", interval(timeframe_secs).to_string()),
                        ("outputsize", "compact".to_string()),
                    ])
                    .await?;
                parse_intraday(&payload)?
            }
            Endpoint::ExchangeRate => {
                let payload = self
                    .get_json(&[
                        ("function", "CURRENCY_EXCHANGE_RATE".to_string()),
                        ("from_currency", base.to_string()),
                        ("to_currency", quote.to_string()),
                    ])
                    .await?;
                parse_exchange_rate(&payload, timeframe_secs, now)?
            }
        };

        debug!("alphavantage returned {} candles for {}", series.len(), asset);
        Ok(series)
    }
}

fn check_error_payload(payload: &Value) -> Result<()> {
    for key in ERROR_KEYS {
        if let Some(message) = payload.get(*key) {
            return Err(FeedError::ExternalApi(format!(
                "{}: {}",
                key,
                message.as_str().unwrap_or_default()
            )));
        }
    }
    Ok(())
}

/// Parse an intraday payload, keeping the most recent 50 points.
fn parse_intraday(payload: &Value) -> Result<CandleSeries> {
    let series_value = payload
        .as_object()
        .and_then(|map| {
            map.iter()
                .find(|(key, _)| key.starts_with("Time Series"))
                .map(|(_, value)| value.clone())
        })
        .ok_or_else(|| FeedError::ExternalApi("No time series data available".to_string()))?;

    let points: HashMap<String, TimeSeriesDataPoint> = serde_json::from_value(series_value)?;

    let candles: Vec<Candle> = points
        .into_iter()
        .filter_map(|(time_str, point)| {
            let timestamp = NaiveDateTime::parse_from_str(&time_str, TIME_FORMAT)
                .ok()?
                .and_utc()
                .timestamp();
            Some(Candle::new(
                point.open.parse().ok()?,
                point.high.parse().ok()?,
                point.low.parse().ok()?,
                point.close.parse().ok()?,
                timestamp,
            ))
        })
        .collect();

    let series = CandleSeries::from_unordered(candles).tail(MAX_POINTS);
    if series.is_empty() {
        return Err(FeedError::ExternalApi("Empty time series".to_string()));
    }
    Ok(series)
}

/// Spot rate as one flat candle in the last closed slot.
fn parse_exchange_rate(payload: &Value, timeframe_secs: i64, now: i64) -> Result<CandleSeries> {
    let response: ExchangeRateResponse = serde_json::from_value(payload.clone())?;
    let rate: f64 = response
        .rate
        .and_then(|r| r.rate.parse().ok())
        .ok_or_else(|| FeedError::ExternalApi("No exchange rate available".to_string()))?;

    let tf = timeframe_secs.max(60);
    let closed_slot = now.div_euclid(tf) * tf - tf;
    Ok(CandleSeries::from_unordered(vec![Candle::flat(rate, closed_slot)]))
}
