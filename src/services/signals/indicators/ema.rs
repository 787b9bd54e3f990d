//! Exponential Moving Average (EMA) indicator.

use super::sma::sma;

/// EMA series seeded with the SMA of the first `period` values.
///
/// Element `i` of the result corresponds to `values[period - 1 + i]`. Empty
/// when fewer than `period` values exist.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len() - period + 1);

    // First EMA is SMA
    let mut ema = values.iter().take(period).sum::<f64>() / period as f64;
    series.push(ema);

    for value in &values[period..] {
        ema = (value - ema) * multiplier + ema;
        series.push(ema);
    }

    series
}

/// Latest EMA value, falling back to the plain average when history is short.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    match ema_series(values, period).last() {
        Some(value) => Some(*value),
        None => sma(values, period),
    }
}
