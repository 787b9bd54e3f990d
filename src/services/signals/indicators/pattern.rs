//! Candlestick pattern classifier.

use crate::types::{Bias, Candle};

pub const DOJI_STRENGTH: i32 = 5;
pub const PIN_BAR_STRENGTH: i32 = 25;
pub const ENGULFING_STRENGTH: i32 = 20;

/// Result of classifying the most recent candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternReading {
    pub bias: Bias,
    pub strength: i32,
    pub kind: PatternKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    None,
}

impl PatternReading {
    fn new(kind: PatternKind, bias: Bias, strength: i32) -> Self {
        Self { bias, strength, kind }
    }

    fn none() -> Self {
        Self::new(PatternKind::None, Bias::Neutral, 0)
    }
}

/// Classify the last candles of a series (the final three are inspected).
///
/// First match wins:
/// 1. Doji: body under 10% of range (or no range at all), neutral.
/// 2. Hammer / shooting star: one wick at least 2x the body, the other under 0.5x.
/// 3. Engulfing: current body fully contains and reverses the previous body.
pub fn classify_pattern(candles: &[Candle]) -> PatternReading {
    let Some(current) = candles.last() else {
        return PatternReading::none();
    };

    let body = current.body();
    let range = current.range();
    if range <= 0.0 || body < range * 0.1 {
        return PatternReading::new(PatternKind::Doji, Bias::Neutral, DOJI_STRENGTH);
    }

    let upper = current.upper_wick();
    let lower = current.lower_wick();
    if lower >= body * 2.0 && upper < body * 0.5 {
        return PatternReading::new(PatternKind::Hammer, Bias::Call, PIN_BAR_STRENGTH);
    }
    if upper >= body * 2.0 && lower < body * 0.5 {
        return PatternReading::new(PatternKind::ShootingStar, Bias::Put, PIN_BAR_STRENGTH);
    }

    if let [.., previous, _] = candles {
        if previous.is_bearish()
            && current.is_bullish()
            && current.open <= previous.close
            && current.close >= previous.open
        {
            return PatternReading::new(
                PatternKind::BullishEngulfing,
                Bias::Call,
                ENGULFING_STRENGTH,
            );
        }
        if previous.is_bullish()
            && current.is_bearish()
            && current.open >= previous.close
            && current.close <= previous.open
        {
            return PatternReading::new(
                PatternKind::BearishEngulfing,
                Bias::Put,
                ENGULFING_STRENGTH,
            );
        }
    }

    PatternReading::none()
}
