//! Simple Moving Average (SMA) indicator.

/// Mean of the last `period` values.
///
/// With fewer than `period` values the available ones are averaged instead.
/// Returns `None` only for an empty input or a zero period.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() || period == 0 {
        return None;
    }
    let window = &values[values.len().saturating_sub(period)..];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_full_period() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&values, 2), Some(4.5));
        assert_eq!(sma(&values, 5), Some(3.0));
    }

    #[test]
    fn test_sma_partial_period_averages_available() {
        assert_eq!(sma(&[2.0, 4.0], 20), Some(3.0));
    }

    #[test]
    fn test_sma_empty() {
        assert_eq!(sma(&[], 10), None);
        assert_eq!(sma(&[1.0], 0), None);
    }
}
