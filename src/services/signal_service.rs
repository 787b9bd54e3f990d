use crate::error::SignalError;
use crate::services::feed::MarketDataFeed;
use crate::services::market_hours::is_forex_closed;
use crate::services::recorder::SignalRecorder;
use crate::services::signals::{consensus_signal, SignalEngine};
use crate::types::{
    AssetIdentity, DataSource, EntryTime, SignalRecord, SignalResponse, Timeframe,
};
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parse a caller timezone as a fixed UTC offset.
///
/// Accepts `UTC`, `GMT`, `Z`, `+05:30`, `-0400`, `+3`, `UTC+5:30` and
/// `GMT-03`. Returns `None` for anything else.
pub fn parse_utc_offset(tz: &str) -> Option<FixedOffset> {
    let upper = tz.trim().to_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);

    if rest.is_empty() || rest == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    if !digits.is_ascii() {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };

    if hours.is_empty() || !hours.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Resolve a caller timezone to its UTC offset at `now`.
///
/// IANA names such as `Asia/Kolkata` go through the tz database, so daylight
/// saving is honored. Anything else is read by [`parse_utc_offset`].
pub fn resolve_offset(tz: &str, now: DateTime<Utc>) -> Option<FixedOffset> {
    let trimmed = tz.trim();
    if let Ok(zone) = trimmed.parse::<Tz>() {
        return Some(zone.offset_from_utc_datetime(&now.naive_utc()).fix());
    }
    parse_utc_offset(trimmed)
}

/// Inbound signal boundary.
///
/// Normalizes the request, pulls candles from the feed, runs the engine and
/// records the result without waiting for the recorder.
pub struct SignalService {
    feed: Arc<MarketDataFeed>,
    engine: SignalEngine,
    recorder: Arc<dyn SignalRecorder>,
    enforce_market_hours: bool,
}

impl SignalService {
    pub fn new(
        feed: Arc<MarketDataFeed>,
        engine: SignalEngine,
        recorder: Arc<dyn SignalRecorder>,
        enforce_market_hours: bool,
    ) -> Self {
        Self {
            feed,
            engine,
            recorder,
            enforce_market_hours,
        }
    }

    /// Compute a signal for `asset` on `timeframe` as of now.
    pub async fn get_signal(
        &self,
        asset: &str,
        timeframe: &str,
        broker_hint: Option<&str>,
        timezone: &str,
    ) -> Result<SignalResponse, SignalError> {
        self.get_signal_at(asset, timeframe, broker_hint, timezone, Utc::now())
            .await
    }

    /// Same as [`get_signal`](Self::get_signal) with an explicit clock.
    pub async fn get_signal_at(
        &self,
        asset: &str,
        timeframe: &str,
        broker_hint: Option<&str>,
        timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<SignalResponse, SignalError> {
        let identity = AssetIdentity::parse(asset)
            .ok_or_else(|| SignalError::InvalidAsset(asset.to_string()))?;
        let tf = Timeframe::parse(timeframe)
            .ok_or_else(|| SignalError::InvalidTimeframe(timeframe.to_string()))?;

        if self.enforce_market_hours && !identity.is_otc && is_forex_closed(now) {
            return Err(SignalError::MarketClosed(identity.to_string()));
        }

        let (offset, time_zone) = match resolve_offset(timezone, now) {
            Some(offset) => (offset, timezone.trim().to_string()),
            None => {
                warn!("Unrecognized timezone {:?}, using UTC", timezone);
                (Utc.fix(), "UTC".to_string())
            }
        };
        let entry_time = EntryTime::next_minute(now.with_timezone(&offset));

        let hint = broker_hint
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_uppercase);
        let sourced = self
            .feed
            .get_candles_with_hint(&identity, tf, hint.as_deref())
            .await;

        let signal = match self.engine.analyze(&sourced.series, &identity, entry_time) {
            Some(signal) => signal,
            None => {
                debug!(
                    "No engine signal for {} ({} candles), using consensus",
                    identity,
                    sourced.series.len()
                );
                consensus_signal(&identity, entry_time, self.engine.config())
            }
        };

        let broker = match sourced.source {
            DataSource::Broker(ref name) => Some(name.clone()),
            _ => hint,
        };
        let signal_id = format!(
            "{}_{}_{}",
            broker.as_deref().unwrap_or("AUTO"),
            identity.symbol,
            now.timestamp()
        );

        let response = SignalResponse {
            signal_id,
            direction: signal.direction,
            confidence: signal.confidence,
            entry_time: signal.entry_time,
            time_zone,
            asset: identity.to_string(),
            broker,
            strategy: signal.strategy_tag,
            data_quality: sourced.source.quality(),
            source: sourced.source,
        };

        info!(
            "{} {} {} {}% @ {} [{}]",
            response.signal_id,
            response.asset,
            response.direction,
            response.confidence,
            response.entry_time,
            response.strategy
        );

        let recorder = Arc::clone(&self.recorder);
        let record = SignalRecord::from(&response);
        tokio::task::spawn_blocking(move || recorder.record_signal(&record));

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_offset_variants() {
        let cases = [
            ("UTC", 0),
            ("z", 0),
            ("GMT", 0),
            ("+05:30", 19800),
            ("-0400", -14400),
            ("UTC+3", 10800),
            ("utc-03:30", -12600),
            ("GMT+14", 50400),
        ];
        for (input, secs) in cases {
            assert_eq!(
                parse_utc_offset(input).map(|o| o.local_minus_utc()),
                Some(secs),
                "input {input}"
            );
        }
    }

    #[test]
    fn test_parse_utc_offset_rejects_garbage() {
        for input in ["Asia/Kolkata", "+25", "+05:75", "UTC+", "5", "+1é1", "UTC+é", "-é"] {
            assert!(parse_utc_offset(input).is_none(), "input {input}");
        }
    }

    #[test]
    fn test_resolve_offset_named_zones() {
        let winter = Utc.with_ymd_and_hms(2024, 3, 6, 10, 15, 30).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 3, 10, 15, 30).unwrap();

        let kolkata = resolve_offset("Asia/Kolkata", winter).map(|o| o.local_minus_utc());
        assert_eq!(kolkata, Some(19800));

        let ny = |at| resolve_offset(" America/New_York ", at).map(|o| o.local_minus_utc());
        assert_eq!(ny(winter), Some(-18000));
        assert_eq!(ny(summer), Some(-14400));

        assert_eq!(resolve_offset("UTC", winter).map(|o| o.local_minus_utc()), Some(0));
        assert_eq!(resolve_offset("+05:30", winter).map(|o| o.local_minus_utc()), Some(19800));
        assert!(resolve_offset("Mars/Olympus", winter).is_none());
        assert!(resolve_offset("+1é1", winter).is_none());
    }
}
