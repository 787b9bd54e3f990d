//! Average True Range (ATR) indicator.

use crate::types::Candle;

/// True range of `current` against the previous close.
pub fn true_range(current: &Candle, previous: &Candle) -> f64 {
    let hl = current.high - current.low;
    let hc = (current.high - previous.close).abs();
    let lc = (current.low - previous.close).abs();
    hl.max(hc).max(lc)
}

/// Mean true range over the last `period` candles.
///
/// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
///
/// Uses whatever ranges are available when history is shorter than
/// `period`. A single candle contributes its plain high-low range.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    match candles {
        [] => None,
        [only] => Some(only.range()),
        _ => {
            let ranges: Vec<f64> = candles
                .windows(2)
                .map(|w| true_range(&w[1], &w[0]))
                .collect();
            let window = &ranges[ranges.len().saturating_sub(period)..];
            Some(window.iter().sum::<f64>() / window.len() as f64)
        }
    }
}
