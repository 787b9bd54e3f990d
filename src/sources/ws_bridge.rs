//! WebSocket broker bridge.
//!
//! Each fetch opens its own connection, authenticates, sends
//! `{"action":"candles","asset":..,"period":..,"count":..}` and waits for
//! the first reply carrying a `candles` list.

use crate::config::BrokerConfig;
use crate::error::{FeedError, Result};
use crate::sources::http_bridge::parse_candles;
use crate::sources::CandleSource;
use crate::types::{AssetIdentity, CandleSeries};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize)]
struct AuthMessage<'a> {
    action: &'static str,
    token: &'a str,
}

#[derive(Debug, Serialize)]
struct CandlesRequest<'a> {
    action: &'static str,
    asset: &'a str,
    period: i64,
    count: usize,
}

/// WebSocket broker bridge.
pub struct WsBridge {
    config: BrokerConfig,
    connected: AtomicBool,
}

impl WsBridge {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
        }
    }

    /// Open a connection and complete the auth exchange.
    async fn handshake(&self) -> Result<WsStream> {
        let (mut ws, _) = connect_async(self.config.url.as_str()).await?;

        if let Some(ref token) = self.config.token {
            let auth = AuthMessage {
                action: "auth",
                token,
            };
            ws.send(Message::Text(serde_json::to_string(&auth)?)).await?;
        }

        tokio::time::timeout(HANDSHAKE_TIMEOUT, next_json(&mut ws))
            .await
            .map_err(|_| FeedError::Timeout {
                source_name: self.config.name.clone(),
                secs: HANDSHAKE_TIMEOUT.as_secs(),
            })??;

        Ok(ws)
    }

    async fn request(&self, pair: &str, timeframe_secs: i64, count: usize) -> Result<CandleSeries> {
        let mut ws = self.handshake().await?;

        let request = CandlesRequest {
            action: "candles",
            asset: pair,
            period: timeframe_secs,
            count,
        };
        ws.send(Message::Text(serde_json::to_string(&request)?)).await?;

        loop {
            let reply = next_json(&mut ws).await?;
            if reply.get("candles").is_some_and(Value::is_array) {
                let _ = ws.close(None).await;
                return parse_candles(&reply);
            }
            debug!("{} ignoring non-candle message", self.config.name);
        }
    }
}

/// Read until the next text frame that parses as JSON.
async fn next_json(ws: &mut WsStream) -> Result<Value> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => return Ok(value),
                Err(_) => continue,
            },
            Message::Ping(data) => {
                let _ = ws.send(Message::Pong(data)).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Err(FeedError::WebSocket("connection closed".to_string()))
}

#[async_trait::async_trait]
impl CandleSource for WsBridge {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> &'static str {
        "ws"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn connect(&self) -> Result<()> {
        match self.handshake().await {
            Ok(mut ws) => {
                let _ = ws.close(None).await;
                self.connected.store(true, Ordering::Relaxed);
                info!("{} WebSocket bridge connected at {}", self.config.name, self.config.url);
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::Relaxed);
                warn!("{} WebSocket bridge handshake failed: {}", self.config.name, e);
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

        tokio::time::timeout(
            REQUEST_TIMEOUT,
            self.request(&asset.bridge_pair(), timeframe_secs, count),
        )
        .await
        .map_err(|_| FeedError::Timeout {
            source_name: self.config.name.clone(),
            secs: REQUEST_TIMEOUT.as_secs(),
        })?
    }
}
