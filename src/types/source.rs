use crate::types::CandleSeries;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which waterfall step produced a candle series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DataSource {
    /// Rate-limited external quote API (Alpha Vantage).
    ExternalApi,
    /// Latest price from the streaming tick feed.
    TickStream,
    /// A configured broker bridge, by name.
    Broker(String),
    /// Deterministic synthetic generator.
    Synthetic,
}

impl DataSource {
    /// Whether the series came from a live market source.
    pub fn is_real(&self) -> bool {
        !matches!(self, DataSource::Synthetic)
    }

    /// Whether the newest candle may still be forming and must be dropped.
    pub fn has_forming_candle(&self) -> bool {
        matches!(self, DataSource::ExternalApi | DataSource::Broker(_))
    }

    /// Data quality label exposed to callers.
    pub fn quality(&self) -> DataQuality {
        if self.is_real() {
            DataQuality::Real
        } else {
            DataQuality::Simulated
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::ExternalApi => write!(f, "alphavantage"),
            DataSource::TickStream => write!(f, "tick_stream"),
            DataSource::Broker(name) => write!(f, "broker:{}", name.to_lowercase()),
            DataSource::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Data quality of the candles behind a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataQuality {
    Real,
    Simulated,
}

/// Candle series tagged with the waterfall step that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedSeries {
    pub series: CandleSeries,
    pub source: DataSource,
}

impl SourcedSeries {
    pub fn new(series: CandleSeries, source: DataSource) -> Self {
        Self { series, source }
    }
}

/// Connectivity snapshot for one source, reported by the heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub name: String,
    pub kind: String,
    pub connected: bool,
    pub preferred: bool,
}

impl SourceStatus {
    pub fn status_label(&self) -> &'static str {
        if self.connected {
            "ONLINE"
        } else {
            "OFFLINE"
        }
    }
}
