//! Augur - deterministic multi-source candle feed and CALL/PUT signal engine

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

pub use config::Config;
pub use error::{FeedError, SignalError};
pub use services::{MarketDataFeed, SignalEngine, SignalService};
pub use types::{
    AssetIdentity, Candle, CandleSeries, DataQuality, DataSource, Direction, EntryTime, Signal,
    SignalResponse, Timeframe,
};
