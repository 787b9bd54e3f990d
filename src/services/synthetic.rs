//! Deterministic synthetic candle generator.
//!
//! Last-resort data source for the feed. Output depends only on the asset
//! key, the hour bucket, the timeframe and the requested count, so every
//! process asking in the same minute sees the same series.

use crate::services::seed::Seed;
use crate::types::{AssetIdentity, Candle, CandleSeries};

const HOUR_SECS: i64 = 3600;

/// Generate `count` candles ending at the slot that contains `now`.
///
/// `now` is Unix seconds. Never fails; `count == 0` yields a single candle so
/// callers always receive a non-empty series.
pub fn generate(asset: &AssetIdentity, timeframe_secs: i64, count: usize, now: i64) -> CandleSeries {
    let key = asset.cache_key();
    let tf = timeframe_secs.max(60);
    let hour_bucket = now.div_euclid(HOUR_SECS) * HOUR_SECS;
    let current_slot = now.div_euclid(tf) * tf;

    let base_seed = Seed::from_parts(&[key.as_str(), &hour_bucket.to_string()]);
    let mut price = 1.0 + base_seed.modulo(1000) as f64 / 5000.0;

    let count = count.max(1);
    let mut candles = Vec::with_capacity(count);
    for i in 0..count as i64 {
        let slot_ts = current_slot - i * tf;
        let slot_seed = Seed::from_parts(&[
            key.as_str(),
            &hour_bucket.to_string(),
            &slot_ts.to_string(),
        ]);

        let delta = (slot_seed.modulo(1001) as f64 - 500.0) / 100_000.0;
        let upper = slot_seed.modulo(100) as f64 / 100_000.0;
        let lower = slot_seed.shr(4).modulo(100) as f64 / 100_000.0;

        let open = price;
        let close = open + delta;
        candles.push(Candle {
            open,
            high: open.max(close) + upper,
            low: open.min(close) - lower,
            close,
            timestamp: slot_ts,
        });
        price = close;
    }

    candles.reverse();
    CandleSeries::from_unordered(candles)
}

/// Seconds until the next minute boundary after `now`, at least one.
pub fn secs_until_next_minute(now: i64) -> u64 {
    (60 - now.rem_euclid(60)) as u64
}
