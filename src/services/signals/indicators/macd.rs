//! MACD (Moving Average Convergence Divergence) indicator.

use super::ema::ema_series;

/// Latest MACD reading.
///
/// - MACD Line = EMA(fast) - EMA(slow)
/// - Signal Line = EMA(signal) of the MACD line
/// - Histogram = MACD Line - Signal Line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdReading {
    pub fn is_bullish(&self) -> bool {
        self.macd > self.signal
    }

    pub fn is_bearish(&self) -> bool {
        self.macd < self.signal
    }
}

/// Compute MACD over `closes`.
///
/// Returns `None` (unavailable) with fewer than `slow` closes. When the MACD
/// line is too short for the signal EMA, the signal line equals the MACD
/// line and the histogram is zero.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdReading> {
    if fast == 0 || slow == 0 || closes.len() < slow {
        return None;
    }

    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    // Align both series on the slow EMA's first index
    let offset = slow.saturating_sub(fast);
    let line: Vec<f64> = slow_ema
        .iter()
        .enumerate()
        .filter_map(|(i, slow_value)| fast_ema.get(i + offset).map(|f| f - slow_value))
        .collect();

    let macd_value = *line.last()?;
    let signal_value = ema_series(&line, signal)
        .last()
        .copied()
        .unwrap_or(macd_value);

    Some(MacdReading {
        macd: macd_value,
        signal: signal_value,
        histogram: macd_value - signal_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_unavailable_below_slow() {
        let closes = vec![1.0; 12];
        assert!(macd(&closes, 5, 13, 4).is_none());
    }

    #[test]
    fn test_macd_short_line_uses_macd_as_signal() {
        let closes: Vec<f64> = (0..13).map(|i| 1.0 + i as f64 * 0.01).collect();
        let reading = macd(&closes, 5, 13, 4).unwrap();
        assert_eq!(reading.signal, reading.macd);
        assert_eq!(reading.histogram, 0.0);
    }

    #[test]
    fn test_macd_uptrend_positive() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let reading = macd(&closes, 12, 26, 9).unwrap();
        assert!(reading.macd > 0.0);
    }

    #[test]
    fn test_macd_reversal_crosses_signal() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64 * 0.5).collect();
        closes.extend((0..6).map(|i| 85.5 + i as f64 * 2.0));
        let reading = macd(&closes, 5, 13, 4).unwrap();
        assert!(reading.is_bullish(), "{reading:?}");
    }

    #[test]
    fn test_macd_flat_is_neutral() {
        let reading = macd(&[1.0; 30], 5, 13, 4).unwrap();
        assert!(!reading.is_bullish() && !reading.is_bearish());
    }
}
