use thiserror::Error;

/// Errors raised by individual data sources.
///
/// The market data feed treats every variant as "try the next step"; none of
/// them reach the caller of `get_candles`.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("{source_name} timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        FeedError::WebSocket(err.to_string())
    }
}

/// Errors surfaced by the signal service boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("Market closed: {0}")]
    MarketClosed(String),

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),
}

pub type Result<T> = std::result::Result<T, FeedError>;
