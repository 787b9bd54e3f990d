use crate::config::TickStreamConfig;
use crate::types::AssetIdentity;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Prices older than this are not served.
const STALE_AFTER_SECS: i64 = 30;
const SYMBOL_PREFIX: &str = "frx";

/// Tick subscription message.
#[derive(Debug, Serialize)]
struct SubscribeMessage {
    ticks: String,
    subscribe: u8,
}

/// Tick stream message.
#[derive(Debug, Deserialize)]
struct TickMessage {
    msg_type: Option<String>,
    tick: Option<Tick>,
}

#[derive(Debug, Deserialize)]
struct Tick {
    symbol: String,
    quote: f64,
    epoch: i64,
}

/// Last price seen for a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPrice {
    pub price: f64,
    pub epoch: i64,
}

/// Streaming forex tick client.
#[derive(Clone)]
pub struct TickStream {
    url: String,
    symbols: Vec<String>,
    prices: Arc<DashMap<String, TickPrice>>,
    connected: Arc<AtomicBool>,
}

impl TickStream {
    /// Create a new tick stream client.
    pub fn new(config: TickStreamConfig) -> Self {
        Self {
            url: config.url,
            symbols: config.symbols,
            prices: Arc::new(DashMap::new()),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Connect and keep receiving ticks, reconnecting after 5 seconds on failure.
    pub async fn connect(&self) -> anyhow::Result<()> {
        loop {
            match self.run_connection().await {
                Ok(_) => {
                    warn!("Tick stream disconnected, reconnecting...");
                }
                Err(e) => {
                    error!("Tick stream error: {}, reconnecting...", e);
                }
            }
            self.connected.store(false, Ordering::Relaxed);
            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
        }
    }

    async fn run_connection(&self) -> anyhow::Result<()> {
        info!("Connecting to tick stream at {}", self.url);
        let (ws_stream, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        for symbol in &self.symbols {
            let msg = SubscribeMessage {
                ticks: format!("{}{}", SYMBOL_PREFIX, symbol),
                subscribe: 1,
            };
            write.send(Message::Text(serde_json::to_string(&msg)?)).await?;
        }

        self.connected.store(true, Ordering::Relaxed);
        info!("Tick stream connected, subscribed to {} symbols", self.symbols.len());

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_message(&text),
                Ok(Message::Ping(data)) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(_)) => {
                    info!("Tick stream closed");
                    break;
                }
                Err(e) => {
                    error!("Tick stream read error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn handle_message(&self, text: &str) {
        let msg: TickMessage = match serde_json::from_str(text) {
            Ok(m) => m,
            Err(_) => return,
        };

        if msg.msg_type.as_deref() != Some("tick") {
            return;
        }

        if let Some(tick) = msg.tick {
            let symbol = tick
                .symbol
                .strip_prefix(SYMBOL_PREFIX)
                .unwrap_or(&tick.symbol)
                .to_uppercase();
            debug!("Tick: {} = {}", symbol, tick.quote);
            self.record_tick(&symbol, tick.quote, tick.epoch);
        }
    }

    /// Store a price for a canonical symbol.
    pub fn record_tick(&self, symbol: &str, price: f64, epoch: i64) {
        if price.is_finite() && price > 0.0 {
            self.prices
                .insert(symbol.to_uppercase(), TickPrice { price, epoch });
        }
    }

    /// Latest price for a real-market asset if it is at most 30 seconds old.
    pub fn latest_price(&self, asset: &AssetIdentity, now: i64) -> Option<f64> {
        if asset.is_otc {
            return None;
        }
        let tick = *self.prices.get(&asset.symbol)?;
        (now - tick.epoch <= STALE_AFTER_SECS).then_some(tick.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> TickStream {
        TickStream::new(TickStreamConfig {
            url: "wss://ws.example.invalid/websockets/v3".to_string(),
            symbols: vec!["EURUSD".to_string()],
        })
    }

    #[test]
    fn test_subscribe_wire_shape() {
        let msg = SubscribeMessage {
            ticks: "frxEURUSD".to_string(),
            subscribe: 1,
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"ticks":"frxEURUSD","subscribe":1}"#
        );
    }

    #[test]
    fn test_handle_tick_message() {
        let ticks = stream();
        ticks.handle_message(
            r#"{"msg_type":"tick","tick":{"symbol":"frxEURUSD","quote":1.0951,"epoch":1700000000}}"#,
        );
        let eurusd = AssetIdentity::parse("EUR/USD").unwrap();
        assert_eq!(ticks.latest_price(&eurusd, 1_700_000_010), Some(1.0951));
    }

    #[test]
    fn test_ignores_other_messages() {
        let ticks = stream();
        ticks.handle_message(r#"{"msg_type":"ping","ping":"pong"}"#);
        ticks.handle_message("not json");
        let eurusd = AssetIdentity::parse("EURUSD").unwrap();
        assert_eq!(ticks.latest_price(&eurusd, 0), None);
    }

    #[test]
    fn test_stale_and_otc_prices_not_served() {
        let ticks = stream();
        ticks.record_tick("EURUSD", 1.1, 1_700_000_000);
        let eurusd = AssetIdentity::parse("EURUSD").unwrap();
        let otc = AssetIdentity::parse("EURUSD_otc").unwrap();
        assert_eq!(ticks.latest_price(&eurusd, 1_700_000_031), None);
        assert_eq!(ticks.latest_price(&otc, 1_700_000_001), None);
        assert!(!ticks.is_connected());
    }
}
