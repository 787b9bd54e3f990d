use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Broker bridges in registration order. Each one is enabled by setting
/// `<NAME>_BRIDGE_URL`.
pub const BROKER_NAMES: &[&str] = &["QUOTEX", "IQOPTION", "POCKETOPTION", "BINOLLA"];

/// Transport used by a broker bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeKind {
    /// REST endpoint returning a candle list.
    Http,
    /// WebSocket endpoint answering candle requests.
    Ws,
}

impl FromStr for BridgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" | "https" | "rest" => Ok(Self::Http),
            "ws" | "wss" | "websocket" => Ok(Self::Ws),
            other => Err(format!("unknown bridge kind: {}", other)),
        }
    }
}

/// Configuration for one broker bridge.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker name, e.g. `QUOTEX`.
    pub name: String,
    pub kind: BridgeKind,
    /// Base URL of the bridge endpoint.
    pub url: String,
    /// Optional auth token sent during the handshake / as a header.
    pub token: Option<String>,
}

/// Alpha Vantage external quote source.
#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    /// Minimum spacing between outbound requests (free tier allows 5/min).
    pub min_interval: Duration,
}

/// Streaming tick source.
#[derive(Debug, Clone)]
pub struct TickStreamConfig {
    pub url: String,
    /// Canonical symbols to subscribe to, e.g. `EURUSD`.
    pub symbols: Vec<String>,
}

/// Market data feed tuning.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Candles requested from real sources.
    pub candle_count: usize,
    /// Candles produced by the synthetic generator.
    pub synthetic_candles: usize,
    /// Upper bound for any single source call.
    pub fetch_timeout: Duration,
    pub external_ttl: Duration,
    pub broker_ttl: Duration,
    pub tick_ttl: Duration,
    pub connect_retries: u32,
    pub connect_retry_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            candle_count: 50,
            synthetic_candles: 60,
            fetch_timeout: Duration::from_secs(8),
            external_ttl: Duration::from_secs(55),
            broker_ttl: Duration::from_secs(30),
            tick_ttl: Duration::from_secs(5),
            connect_retries: 3,
            connect_retry_delay: Duration::from_secs(5),
        }
    }
}

/// OTC branch parameters.
#[derive(Debug, Clone)]
pub struct OtcBranchConfig {
    pub min_candles: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub sma_period: usize,
    /// Squeeze when stddev falls below `sma * squeeze_ratio`.
    pub squeeze_ratio: f64,
    pub rsi_deep_oversold: f64,
    pub rsi_deep_overbought: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_deep_weight: i32,
    pub rsi_weight: i32,
    pub macd_weight: i32,
    pub confidence_floor: i32,
    pub confidence_divisor: i32,
    pub confidence_spread: i32,
}

impl Default for OtcBranchConfig {
    fn default() -> Self {
        Self {
            min_candles: 20,
            rsi_period: 7,
            macd_fast: 5,
            macd_slow: 13,
            macd_signal: 4,
            sma_period: 20,
            squeeze_ratio: 0.00005,
            rsi_deep_oversold: 20.0,
            rsi_deep_overbought: 80.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_deep_weight: 50,
            rsi_weight: 25,
            macd_weight: 20,
            confidence_floor: 88,
            confidence_divisor: 5,
            confidence_spread: 10,
        }
    }
}

/// Real-market branch parameters.
#[derive(Debug, Clone)]
pub struct RealBranchConfig {
    pub min_candles: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_weight: i32,
    pub trend_fast: usize,
    pub trend_slow: usize,
    pub trend_weight: i32,
    pub atr_period: usize,
    /// High volatility when `atr / close` exceeds this ratio.
    pub volatility_ratio: f64,
    pub confidence_floor: i32,
    pub confidence_divisor: i32,
    pub confidence_spread: i32,
}

impl Default for RealBranchConfig {
    fn default() -> Self {
        Self {
            min_candles: 30,
            rsi_period: 14,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            rsi_weight: 25,
            trend_fast: 10,
            trend_slow: 20,
            trend_weight: 30,
            atr_period: 14,
            volatility_ratio: 0.004,
            confidence_floor: 89,
            confidence_divisor: 4,
            confidence_spread: 9,
        }
    }
}

/// Signal engine configuration. Defaults are the canonical constant set.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub otc: OtcBranchConfig,
    pub real: RealBranchConfig,
    /// Percentage both weights keep under a squeeze / volatility damping.
    pub damping_pct: i32,
    pub confidence_lower: u8,
    pub confidence_upper: u8,
    /// Width of the consensus fallback confidence band above `confidence_lower`.
    pub consensus_spread: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            otc: OtcBranchConfig::default(),
            real: RealBranchConfig::default(),
            damping_pct: 90,
            confidence_lower: 91,
            confidence_upper: 99,
            consensus_spread: 8,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique ID of this process, reported by the heartbeat.
    pub instance_id: String,
    pub feed: FeedConfig,
    pub engine: EngineConfig,
    pub alpha_vantage: Option<AlphaVantageConfig>,
    pub tick_stream: Option<TickStreamConfig>,
    pub brokers: Vec<BrokerConfig>,
    pub heartbeat_interval: Duration,
    /// Reject non-OTC signals while the forex market is closed.
    pub enforce_market_hours: bool,
    /// SQLite file for signal tracking; log-only when unset.
    pub signal_db_path: Option<String>,
    /// Asset labels the daemon computes signals for each minute.
    pub watchlist: Vec<String>,
    pub watchlist_timezone: String,
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let feed_defaults = FeedConfig::default();
        let feed = FeedConfig {
            candle_count: parse_env("FEED_CANDLE_COUNT", feed_defaults.candle_count),
            synthetic_candles: parse_env("SYNTHETIC_CANDLES", feed_defaults.synthetic_candles),
            fetch_timeout: Duration::from_secs(parse_env("FEED_FETCH_TIMEOUT_SECS", 8)),
            external_ttl: Duration::from_secs(parse_env("FEED_EXTERNAL_TTL_SECS", 55)),
            broker_ttl: Duration::from_secs(parse_env("FEED_BROKER_TTL_SECS", 30)),
            tick_ttl: Duration::from_secs(parse_env("FEED_TICK_TTL_SECS", 5)),
            connect_retries: parse_env("CONNECT_RETRIES", feed_defaults.connect_retries),
            connect_retry_delay: Duration::from_secs(parse_env("CONNECT_RETRY_DELAY_SECS", 5)),
        };

        let engine_defaults = EngineConfig::default();
        let engine = EngineConfig {
            confidence_lower: parse_env("CONFIDENCE_LOWER", engine_defaults.confidence_lower),
            confidence_upper: parse_env("CONFIDENCE_UPPER", engine_defaults.confidence_upper),
            ..engine_defaults
        };

        let alpha_vantage = env::var("ALPHA_VANTAGE_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(|api_key| AlphaVantageConfig {
                api_key,
                base_url: env::var("ALPHA_VANTAGE_URL")
                    .unwrap_or_else(|_| "https://www.alphavantage.co/query".to_string()),
                min_interval: Duration::from_millis(parse_env(
                    "ALPHA_VANTAGE_MIN_INTERVAL_MS",
                    12_000,
                )),
            });

        let tick_stream = env::var("TICK_STREAM_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .map(|url| TickStreamConfig {
                url,
                symbols: env::var("TICK_STREAM_SYMBOLS")
                    .map(|s| parse_list(&s.to_uppercase()))
                    .unwrap_or_else(|_| {
                        vec!["EURUSD".into(), "GBPUSD".into(), "USDJPY".into()]
                    }),
            });

        let brokers = BROKER_NAMES
            .iter()
            .filter_map(|name| {
                let url = env::var(format!("{}_BRIDGE_URL", name)).ok()?;
                if url.is_empty() {
                    return None;
                }
                let kind = env::var(format!("{}_BRIDGE_KIND", name))
                    .ok()
                    .and_then(|k| k.parse().ok())
                    .unwrap_or(BridgeKind::Http);
                Some(BrokerConfig {
                    name: name.to_string(),
                    kind,
                    url,
                    token: env::var(format!("{}_BRIDGE_TOKEN", name)).ok(),
                })
            })
            .collect();

        Self {
            instance_id: env::var("INSTANCE_ID")
                .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string()),
            feed,
            engine,
            alpha_vantage,
            tick_stream,
            brokers,
            heartbeat_interval: Duration::from_secs(parse_env("HEARTBEAT_SECS", 60)),
            enforce_market_hours: parse_bool_env("ENFORCE_MARKET_HOURS", true),
            signal_db_path: env::var("SIGNAL_DB_PATH").ok().filter(|p| !p.is_empty()),
            watchlist: env::var("WATCHLIST")
                .map(|s| parse_list(&s))
                .unwrap_or_default(),
            watchlist_timezone: env::var("WATCHLIST_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_id: "local".to_string(),
            feed: FeedConfig::default(),
            engine: EngineConfig::default(),
            alpha_vantage: None,
            tick_stream: None,
            brokers: Vec::new(),
            heartbeat_interval: Duration::from_secs(60),
            enforce_market_hours: true,
            signal_db_path: None,
            watchlist: Vec::new(),
            watchlist_timezone: "UTC".to_string(),
        }
    }
}
