//! Integration tests for the signal service boundary

use augur::config::{EngineConfig, FeedConfig};
use augur::error::SignalError;
use augur::services::{
    LogRecorder, MarketDataFeed, SignalEngine, SignalRecorder, SignalService, SqliteRecorder,
    CONSENSUS_TAG,
};
use augur::types::{DataQuality, DataSource, EntryTime};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Feed with no live sources whose synthetic history is too short to analyze.
fn short_history_feed() -> Arc<MarketDataFeed> {
    let config = FeedConfig {
        synthetic_candles: 10,
        ..FeedConfig::default()
    };
    Arc::new(MarketDataFeed::with_sources(config, None, None, Vec::new()))
}

fn service_with(recorder: Arc<dyn SignalRecorder>, enforce_market_hours: bool) -> SignalService {
    SignalService::new(
        short_history_feed(),
        SignalEngine::new(EngineConfig::default()),
        recorder,
        enforce_market_hours,
    )
}

/// Wednesday 2024-03-06 10:15:30 UTC.
fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 6, 10, 15, 30).unwrap()
}

/// Saturday 2024-03-09 12:00:00 UTC.
fn saturday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
}

// =============================================================================
// Fallback Tests
// =============================================================================

#[tokio::test]
async fn test_short_history_uses_consensus_fallback() {
    let service = service_with(Arc::new(LogRecorder), true);

    let response = service
        .get_signal_at("EUR/USD", "M1", None, "UTC", wednesday())
        .await
        .unwrap();

    assert_eq!(response.strategy, CONSENSUS_TAG);
    assert_eq!(response.source, DataSource::Synthetic);
    assert_eq!(response.data_quality, DataQuality::Simulated);
    assert!((91..=99).contains(&response.confidence));
    assert_eq!(response.entry_time, EntryTime::new(10, 16).unwrap());
    assert_eq!(response.asset, "EURUSD");
    assert_eq!(response.broker, None);
    assert_eq!(response.signal_id, format!("AUTO_EURUSD_{}", wednesday().timestamp()));
}

#[tokio::test]
async fn test_same_minute_same_signal_across_services() {
    let a = service_with(Arc::new(LogRecorder), true);
    let b = service_with(Arc::new(LogRecorder), true);
    let now = wednesday();

    let first = a.get_signal_at("GBPJPY_otc", "1", None, "UTC", now).await.unwrap();
    let second = b
        .get_signal_at("gbp/jpy (otc)", "m1", None, "UTC", now + chrono::Duration::seconds(20))
        .await
        .unwrap();

    assert_eq!(first.direction, second.direction);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(first.entry_time, second.entry_time);
    assert_eq!(first.asset, "GBPJPY (OTC)");
}

#[tokio::test]
async fn test_broker_hint_reported_when_synthetic_serves() {
    let service = service_with(Arc::new(LogRecorder), true);

    let response = service
        .get_signal_at("EURUSD_otc", "M1", Some("quotex"), "UTC", wednesday())
        .await
        .unwrap();

    assert_eq!(response.broker.as_deref(), Some("QUOTEX"));
    assert!(response.signal_id.starts_with("QUOTEX_EURUSD_"));
    assert_eq!(response.source, DataSource::Synthetic);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[tokio::test]
async fn test_invalid_inputs_rejected() {
    let service = service_with(Arc::new(LogRecorder), true);
    let now = wednesday();

    let err = service.get_signal_at("EURUSD", "H1", None, "UTC", now).await.unwrap_err();
    assert_eq!(err, SignalError::InvalidTimeframe("H1".to_string()));

    let err = service.get_signal_at("EURUSD", "M0", None, "UTC", now).await.unwrap_err();
    assert!(matches!(err, SignalError::InvalidTimeframe(_)));

    let err = service.get_signal_at(" / ", "M1", None, "UTC", now).await.unwrap_err();
    assert!(matches!(err, SignalError::InvalidAsset(_)));
}

#[tokio::test]
async fn test_market_closed_for_real_assets_only() {
    let service = service_with(Arc::new(LogRecorder), true);

    let err = service
        .get_signal_at("EURUSD", "M1", None, "UTC", saturday())
        .await
        .unwrap_err();
    assert!(matches!(err, SignalError::MarketClosed(_)));

    assert!(service
        .get_signal_at("EURUSD_otc", "M1", None, "UTC", saturday())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_market_hours_enforcement_can_be_disabled() {
    let service = service_with(Arc::new(LogRecorder), false);
    assert!(service
        .get_signal_at("EURUSD", "M1", None, "UTC", saturday())
        .await
        .is_ok());
}

// =============================================================================
// Timezone Tests
// =============================================================================

#[tokio::test]
async fn test_entry_time_in_caller_offset() {
    let service = service_with(Arc::new(LogRecorder), true);

    let response = service
        .get_signal_at("EURUSD_otc", "M1", None, "+05:30", wednesday())
        .await
        .unwrap();
    assert_eq!(response.entry_time.to_string(), "15:46");
    assert_eq!(response.time_zone, "+05:30");

    let response = service
        .get_signal_at("EURUSD_otc", "M1", None, "UTC-04", wednesday())
        .await
        .unwrap();
    assert_eq!(response.entry_time.to_string(), "06:16");
}

#[tokio::test]
async fn test_named_timezone_resolves() {
    let service = service_with(Arc::new(LogRecorder), true);

    let response = service
        .get_signal_at("EURUSD_otc", "M1", None, "Asia/Kolkata", wednesday())
        .await
        .unwrap();
    assert_eq!(response.entry_time.to_string(), "15:46");
    assert_eq!(response.time_zone, "Asia/Kolkata");

    // Eastern standard time until the March DST switch.
    let response = service
        .get_signal_at("EURUSD_otc", "M1", None, "America/New_York", wednesday())
        .await
        .unwrap();
    assert_eq!(response.entry_time.to_string(), "05:16");
}

#[tokio::test]
async fn test_non_ascii_timezone_falls_back_to_utc() {
    let service = service_with(Arc::new(LogRecorder), true);

    for tz in ["+1é1", "UTC+é"] {
        let response = service
            .get_signal_at("EURUSD_otc", "M1", None, tz, wednesday())
            .await
            .unwrap();
        assert_eq!(response.time_zone, "UTC");
        assert_eq!(response.entry_time.to_string(), "10:16");
    }
}

#[tokio::test]
async fn test_unknown_timezone_falls_back_to_utc() {
    let service = service_with(Arc::new(LogRecorder), true);

    let response = service
        .get_signal_at("EURUSD_otc", "M1", None, "Mars/Olympus", wednesday())
        .await
        .unwrap();
    assert_eq!(response.time_zone, "UTC");
    assert_eq!(response.entry_time.to_string(), "10:16");
}

// =============================================================================
// Recording Tests
// =============================================================================

#[tokio::test]
async fn test_signal_is_recorded() {
    let recorder = Arc::new(SqliteRecorder::new_in_memory().unwrap());
    let service = service_with(recorder.clone(), true);

    let response = service
        .get_signal_at("EURUSD_otc", "M5", Some("IQOPTION"), "UTC", wednesday())
        .await
        .unwrap();

    let mut tracked = None;
    for _ in 0..100 {
        tracked = recorder.tracked_signal(&response.signal_id);
        if tracked.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(
        tracked,
        Some((response.direction.to_string(), response.confidence))
    );
}
