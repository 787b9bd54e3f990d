pub mod cache;
pub mod feed;
pub mod heartbeat;
pub mod market_hours;
pub mod recorder;
pub mod seed;
pub mod signal_service;
pub mod signals;
pub mod synthetic;

pub use cache::Cache;
pub use feed::MarketDataFeed;
pub use heartbeat::Heartbeat;
pub use market_hours::is_forex_closed;
pub use recorder::{LogRecorder, SignalRecorder, SqliteRecorder};
pub use seed::Seed;
pub use signal_service::{parse_utc_offset, resolve_offset, SignalService};
pub use signals::{consensus_signal, tie_break, Branch, SignalEngine, CONSENSUS_TAG};
