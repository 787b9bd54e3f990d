use augur::config::Config;
use augur::services::{
    Heartbeat, LogRecorder, MarketDataFeed, SignalEngine, SignalRecorder, SignalService,
    SqliteRecorder,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "augur=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting augur instance {}", config.instance_id);

    let recorder = build_recorder(&config);

    let feed = MarketDataFeed::new(&config);
    feed.start().await;

    let heartbeat = Heartbeat::new(
        Arc::clone(&feed),
        Arc::clone(&recorder),
        config.instance_id.clone(),
        config.heartbeat_interval,
    )
    .spawn();

    let service = SignalService::new(
        Arc::clone(&feed),
        SignalEngine::new(config.engine.clone()),
        recorder,
        config.enforce_market_hours,
    );

    if config.watchlist.is_empty() {
        info!("WATCHLIST is empty; serving heartbeats only");
    } else {
        info!("Watching {} assets: {}", config.watchlist.len(), config.watchlist.join(", "));
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(Duration::from_secs(60));

    loop {
        tokio::select! {
            _ = ticker.tick() => run_watchlist(&service, &config).await,
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down");
                break;
            }
        }
    }

    heartbeat.abort();
    Ok(())
}

/// SQLite when a database path is configured, otherwise log-only.
fn build_recorder(config: &Config) -> Arc<dyn SignalRecorder> {
    match config.signal_db_path {
        Some(ref path) => match SqliteRecorder::new(path) {
            Ok(recorder) => {
                info!("Recording signals to {}", path);
                Arc::new(recorder)
            }
            Err(e) => {
                warn!("Failed to open signal database {}: {}, logging only", path, e);
                Arc::new(LogRecorder)
            }
        },
        None => Arc::new(LogRecorder),
    }
}

async fn run_watchlist(service: &SignalService, config: &Config) {
    for asset in &config.watchlist {
        if let Err(e) = service
            .get_signal(asset, "M1", None, &config.watchlist_timezone)
            .await
        {
            warn!("{}: {}", asset, e);
        }
    }
}
