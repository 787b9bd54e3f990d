//! Standard deviation and volatility helpers.

/// Population standard deviation of the last `period` values.
///
/// Uses the available values when history is shorter than `period`.
pub fn stddev(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() || period == 0 {
        return None;
    }
    let window = &values[values.len().saturating_sub(period)..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
    Some(variance.sqrt())
}

/// Bollinger-style squeeze: deviation tiny relative to the mean.
pub fn is_squeeze(stddev: f64, mean: f64, ratio: f64) -> bool {
    stddev < mean.abs() * ratio
}
