use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLC (Open, High, Low, Close) candle.
///
/// `timestamp` is the opening instant of the candle slot in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub timestamp: i64,
}

impl Candle {
    /// Create a candle, widening high/low so they always bracket open and close.
    pub fn new(open: f64, high: f64, low: f64, close: f64, timestamp: i64) -> Self {
        Self {
            open,
            high: high.max(open).max(close),
            low: low.min(open).min(close),
            close,
            timestamp,
        }
    }

    /// Single-point candle where every price equals `price`.
    pub fn flat(price: f64, timestamp: i64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            timestamp,
        }
    }

    /// Absolute body size.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Check the OHLC invariant and that every price is finite.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite())
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Time-ordered (oldest to newest) sequence of candles.
///
/// Constructed once per fetch or synthesis and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandleSeries(Vec<Candle>);

impl CandleSeries {
    /// Build a series from candles in any order.
    ///
    /// Invalid candles are dropped, the rest sorted by timestamp. When two
    /// candles share a slot the later one in the input wins.
    pub fn from_unordered(candles: Vec<Candle>) -> Self {
        let mut candles: Vec<Candle> = candles.into_iter().filter(Candle::is_valid).collect();
        candles.sort_by_key(|c| c.timestamp);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.timestamp == candle.timestamp => *last = candle,
                _ => deduped.push(candle),
            }
        }
        Self(deduped)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.0
    }

    pub fn last(&self) -> Option<&Candle> {
        self.0.last()
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.0.iter().map(|c| c.close).collect()
    }

    /// Check timestamps are strictly increasing.
    pub fn is_time_ordered(&self) -> bool {
        self.0.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// Drop trailing candles whose slot has not closed at `now`.
    pub fn without_forming(self, timeframe_secs: i64, now: i64) -> Self {
        let mut candles = self.0;
        while candles
            .last()
            .is_some_and(|c| c.timestamp.saturating_add(timeframe_secs) > now)
        {
            candles.pop();
        }
        Self(candles)
    }

    /// Keep at most the `count` newest candles.
    pub fn tail(self, count: usize) -> Self {
        let skip = self.0.len().saturating_sub(count);
        Self(self.0.into_iter().skip(skip).collect())
    }
}

impl From<CandleSeries> for Vec<Candle> {
    fn from(series: CandleSeries) -> Self {
        series.0
    }
}

/// Candle timeframe in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe(u32);

impl Timeframe {
    pub const M1: Timeframe = Timeframe(1);
    pub const M5: Timeframe = Timeframe(5);

    /// Create a timeframe; zero minutes is rejected.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes > 0).then_some(Self(minutes))
    }

    /// Parse `M1`, `m5`, `M15` or a bare minute count such as `"5"`.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('M')
            .or_else(|| trimmed.strip_prefix('m'))
            .unwrap_or(trimmed);
        digits.parse::<u32>().ok().and_then(Self::from_minutes)
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn seconds(&self) -> i64 {
        self.0 as i64 * 60
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::M1
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Candle Tests
    // =========================================================================

    #[test]
    fn test_candle_new_widens_extremes() {
        let candle = Candle::new(1.0, 0.5, 2.0, 1.5, 60);
        assert_eq!(candle.high, 1.5);
        assert_eq!(candle.low, 1.0);
        assert!(candle.is_valid());
    }

    #[test]
    fn test_candle_wicks() {
        let candle = Candle::new(10.0, 12.0, 7.0, 11.0, 0);
        assert_eq!(candle.body(), 1.0);
        assert_eq!(candle.upper_wick(), 1.0);
        assert_eq!(candle.lower_wick(), 3.0);
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
    }

    #[test]
    fn test_candle_invalid_when_high_below_close() {
        let candle = Candle {
            open: 1.0,
            high: 1.0,
            low: 0.9,
            close: 1.2,
            timestamp: 0,
        };
        assert!(!candle.is_valid());
    }

    #[test]
    fn test_candle_wire_shape() {
        let json = r#"{"open":1.1,"high":1.2,"low":1.0,"close":1.15,"timestamp":1700000000}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.timestamp, 1_700_000_000);
        assert_eq!(candle.close, 1.15);
    }

    // =========================================================================
    // CandleSeries Tests
    // =========================================================================

    #[test]
    fn test_series_sorts_and_dedups() {
        let series = CandleSeries::from_unordered(vec![
            Candle::flat(3.0, 180),
            Candle::flat(1.0, 60),
            Candle::flat(2.0, 120),
            Candle::flat(2.5, 120),
        ]);
        assert_eq!(series.len(), 3);
        assert!(series.is_time_ordered());
        assert_eq!(series.closes(), vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_series_drops_invalid() {
        let series = CandleSeries::from_unordered(vec![
            Candle::flat(f64::NAN, 60),
            Candle::flat(1.0, 120),
        ]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_without_forming_drops_open_slot() {
        let series = CandleSeries::from_unordered(vec![
            Candle::flat(1.0, 0),
            Candle::flat(1.0, 60),
            Candle::flat(1.0, 120),
        ]);
        // At t=150 the candle opened at 120 is still forming.
        let closed = series.without_forming(60, 150);
        assert_eq!(closed.len(), 2);
        assert_eq!(closed.last().unwrap().timestamp, 60);
    }

    #[test]
    fn test_without_forming_keeps_closed_slot() {
        let series = CandleSeries::from_unordered(vec![Candle::flat(1.0, 0), Candle::flat(1.0, 60)]);
        assert_eq!(series.without_forming(60, 120).len(), 2);
    }

    #[test]
    fn test_without_forming_far_future_stamp() {
        let series = CandleSeries::from_unordered(vec![
            Candle::flat(1.0, 60),
            Candle::flat(1.0, i64::MAX),
        ]);
        let closed = series.without_forming(60, 1_700_000_000);
        assert_eq!(closed.len(), 1);
        assert_eq!(closed.last().unwrap().timestamp, 60);
    }

    #[test]
    fn test_tail() {
        let series = CandleSeries::from_unordered((0..10).map(|i| Candle::flat(1.0, i * 60)).collect());
        let tail = series.tail(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.as_slice()[0].timestamp, 420);
    }

    // =========================================================================
    // Timeframe Tests
    // =========================================================================

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::parse("M1"), Some(Timeframe::M1));
        assert_eq!(Timeframe::parse("m5"), Some(Timeframe::M5));
        assert_eq!(Timeframe::parse("15").map(|t| t.minutes()), Some(15));
        assert_eq!(Timeframe::parse("M0"), None);
        assert_eq!(Timeframe::parse("H1"), None);
    }

    #[test]
    fn test_timeframe_display() {
        assert_eq!(Timeframe::M5.to_string(), "M5");
        assert_eq!(Timeframe::M5.seconds(), 300);
    }
}
