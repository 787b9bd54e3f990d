//! Weighted CALL/PUT scoring engine.
//!
//! Two branches, selected by `AssetIdentity::is_otc`:
//! - OTC: RSI(7) extremes, MACD(5,13,4) alignment, candle pattern, squeeze damping.
//! - Real: SMA10/SMA20 trend, RSI(14) zones, candle pattern, ATR volatility damping.
//!
//! Scoring ([`SignalEngine::score`]) and resolution ([`SignalEngine::resolve`])
//! are separate so a scorecard can be built by hand.

use crate::config::EngineConfig;
use crate::services::seed::Seed;
use crate::services::signals::indicators::{
    atr, classify_pattern, is_squeeze, macd, rsi, sma, stddev, PatternReading,
};
use crate::types::{AssetIdentity, CandleSeries, Direction, EntryTime, Signal};
use tracing::debug;

/// Indicator branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Otc,
    Real,
}

impl Branch {
    pub fn for_asset(asset: &AssetIdentity) -> Self {
        if asset.is_otc {
            Branch::Otc
        } else {
            Branch::Real
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Otc => "OTC",
            Branch::Real => "REAL",
        }
    }
}

/// Indicator path a contribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    RsiExtreme,
    Rsi,
    Macd,
    Trend,
    Pattern,
}

impl Path {
    pub fn as_str(&self) -> &'static str {
        match self {
            Path::RsiExtreme => "RSI_EXTREME",
            Path::Rsi => "RSI",
            Path::Macd => "MACD",
            Path::Trend => "TREND",
            Path::Pattern => "PATTERN",
        }
    }
}

/// One directional vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub direction: Direction,
    pub weight: i32,
    pub path: Path,
}

/// Accumulated votes for one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorecard {
    pub branch: Branch,
    pub contributions: Vec<Contribution>,
    /// Percentage both weights keep when damping applies.
    pub damping_pct: Option<i32>,
}

impl Scorecard {
    pub fn new(branch: Branch) -> Self {
        Self {
            branch,
            contributions: Vec::new(),
            damping_pct: None,
        }
    }

    pub fn add(&mut self, direction: Direction, weight: i32, path: Path) {
        if weight > 0 {
            self.contributions.push(Contribution {
                direction,
                weight,
                path,
            });
        }
    }

    fn add_pattern(&mut self, pattern: &PatternReading) {
        if let Some(direction) = pattern.bias.direction() {
            self.add(direction, pattern.strength, Path::Pattern);
        }
    }

    pub fn dampen(&mut self, pct: i32) {
        self.damping_pct = Some(pct);
    }

    fn raw_weight(&self, direction: Direction) -> i32 {
        self.contributions
            .iter()
            .filter(|c| c.direction == direction)
            .map(|c| c.weight)
            .sum()
    }

    fn weight(&self, direction: Direction) -> i32 {
        let raw = self.raw_weight(direction);
        match self.damping_pct {
            Some(pct) => raw * pct / 100,
            None => raw,
        }
    }

    pub fn call_weight(&self) -> i32 {
        self.weight(Direction::Call)
    }

    pub fn put_weight(&self) -> i32 {
        self.weight(Direction::Put)
    }

    pub fn has_directional_reading(&self) -> bool {
        !self.contributions.is_empty()
    }

    /// Largest contribution on `direction`'s side; earliest wins ties.
    fn dominant_path(&self, direction: Direction) -> Option<Path> {
        self.contributions
            .iter()
            .filter(|c| c.direction == direction)
            .fold(None::<&Contribution>, |best, c| match best {
                Some(b) if b.weight >= c.weight => Some(b),
                _ => Some(c),
            })
            .map(|c| c.path)
    }
}

/// Deterministic stalemate resolution: `Seed(asset, "HH:MM") mod 2`, even is CALL.
pub fn tie_break(asset: &AssetIdentity, entry_time: EntryTime) -> Direction {
    let seed = Seed::from_parts(&[asset.cache_key(), entry_time.to_string()]);
    Direction::from_parity(seed.modulo(2))
}

/// Signal engine.
pub struct SignalEngine {
    config: EngineConfig,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze a closed-candle series. `None` means "no signal".
    pub fn analyze(
        &self,
        series: &CandleSeries,
        asset: &AssetIdentity,
        entry_time: EntryTime,
    ) -> Option<Signal> {
        let card = self.score(series, Branch::for_asset(asset))?;
        self.resolve(&card, asset, entry_time)
    }

    /// Run the indicator set for `branch`. `None` below the minimum lookback.
    pub fn score(&self, series: &CandleSeries, branch: Branch) -> Option<Scorecard> {
        match branch {
            Branch::Otc => self.score_otc(series),
            Branch::Real => self.score_real(series),
        }
    }

    fn score_otc(&self, series: &CandleSeries) -> Option<Scorecard> {
        let cfg = &self.config.otc;
        if series.len() < cfg.min_candles {
            return None;
        }

        let closes = series.closes();
        let mut card = Scorecard::new(Branch::Otc);

        let rsi_value = rsi(&closes, cfg.rsi_period);
        if rsi_value > cfg.rsi_deep_overbought {
            card.add(Direction::Put, cfg.rsi_deep_weight, Path::RsiExtreme);
        } else if rsi_value < cfg.rsi_deep_oversold {
            card.add(Direction::Call, cfg.rsi_deep_weight, Path::RsiExtreme);
        } else if rsi_value > cfg.rsi_overbought {
            card.add(Direction::Put, cfg.rsi_weight, Path::Rsi);
        } else if rsi_value < cfg.rsi_oversold {
            card.add(Direction::Call, cfg.rsi_weight, Path::Rsi);
        }

        if let Some(reading) = macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal) {
            if reading.is_bullish() {
                card.add(Direction::Call, cfg.macd_weight, Path::Macd);
            } else if reading.is_bearish() {
                card.add(Direction::Put, cfg.macd_weight, Path::Macd);
            }
        }

        let pattern = classify_pattern(series.as_slice());
        card.add_pattern(&pattern);

        if let (Some(mean), Some(deviation)) = (
            sma(&closes, cfg.sma_period),
            stddev(&closes, cfg.sma_period),
        ) {
            if is_squeeze(deviation, mean, cfg.squeeze_ratio) {
                card.dampen(self.config.damping_pct);
            }
        }

        debug!(
            "OTC scoring: rsi={:.2} pattern={:?} call={} put={}",
            rsi_value,
            pattern.kind,
            card.call_weight(),
            card.put_weight()
        );
        Some(card)
    }

    fn score_real(&self, series: &CandleSeries) -> Option<Scorecard> {
        let cfg = &self.config.real;
        if series.len() < cfg.min_candles {
            return None;
        }

        let closes = series.closes();
        let close = *closes.last()?;
        let mut card = Scorecard::new(Branch::Real);

        if let (Some(fast), Some(slow)) = (
            sma(&closes, cfg.trend_fast),
            sma(&closes, cfg.trend_slow),
        ) {
            if close > fast && fast > slow {
                card.add(Direction::Call, cfg.trend_weight, Path::Trend);
            } else if close < fast && fast < slow {
                card.add(Direction::Put, cfg.trend_weight, Path::Trend);
            }
        }

        let rsi_value = rsi(&closes, cfg.rsi_period);
        if rsi_value < cfg.rsi_oversold {
            card.add(Direction::Call, cfg.rsi_weight, Path::Rsi);
        } else if rsi_value > cfg.rsi_overbought {
            card.add(Direction::Put, cfg.rsi_weight, Path::Rsi);
        }

        let pattern = classify_pattern(series.as_slice());
        card.add_pattern(&pattern);

        if let Some(range) = atr(series.as_slice(), cfg.atr_period) {
            if close > 0.0 && range / close > cfg.volatility_ratio {
                card.dampen(self.config.damping_pct);
            }
        }

        debug!(
            "REAL scoring: rsi={:.2} pattern={:?} call={} put={}",
            rsi_value,
            pattern.kind,
            card.call_weight(),
            card.put_weight()
        );
        Some(card)
    }

    /// Turn a scorecard into a signal.
    ///
    /// A stalemate with at least one directional vote goes to [`tie_break`];
    /// a scorecard with no votes at all yields `None`.
    pub fn resolve(
        &self,
        card: &Scorecard,
        asset: &AssetIdentity,
        entry_time: EntryTime,
    ) -> Option<Signal> {
        let call = card.call_weight();
        let put = card.put_weight();

        let (direction, tag) = if call == put {
            if !card.has_directional_reading() {
                return None;
            }
            (
                tie_break(asset, entry_time),
                format!("{}_TIEBREAK", card.branch.as_str()),
            )
        } else {
            let direction = if call > put {
                Direction::Call
            } else {
                Direction::Put
            };
            let path = card.dominant_path(direction).unwrap_or(Path::Pattern);
            (
                direction,
                format!("{}_{}", card.branch.as_str(), path.as_str()),
            )
        };

        Some(Signal {
            direction,
            confidence: self.confidence(card.branch, (call - put).abs()),
            strategy_tag: tag,
            entry_time,
        })
    }

    /// `floor + min(spread, diff / divisor)`, clamped to the configured bounds.
    pub fn confidence(&self, branch: Branch, diff: i32) -> u8 {
        let (floor, divisor, spread) = match branch {
            Branch::Otc => (
                self.config.otc.confidence_floor,
                self.config.otc.confidence_divisor,
                self.config.otc.confidence_spread,
            ),
            Branch::Real => (
                self.config.real.confidence_floor,
                self.config.real.confidence_divisor,
                self.config.real.confidence_spread,
            ),
        };
        let bonus = (diff / divisor.max(1)).clamp(0, spread);
        let lower = self.config.confidence_lower as i32;
        let upper = (self.config.confidence_upper as i32).max(lower);
        (floor + bonus).clamp(lower, upper) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candle;

    fn asset(label: &str) -> AssetIdentity {
        AssetIdentity::parse(label).unwrap()
    }

    fn entry(s: &str) -> EntryTime {
        EntryTime::parse(s).unwrap()
    }

    fn series_from_closes(closes: &[f64]) -> CandleSeries {
        let mut prev = closes[0];
        CandleSeries::from_unordered(
            closes
                .iter()
                .enumerate()
                .map(|(i, close)| {
                    let candle = Candle::new(prev, prev.max(*close), prev.min(*close), *close, i as i64 * 60);
                    prev = *close;
                    candle
                })
                .collect(),
        )
    }

    // =========================================================================
    // Scorecard Tests
    // =========================================================================

    #[test]
    fn test_scorecard_damping_integer_math() {
        let mut card = Scorecard::new(Branch::Otc);
        card.add(Direction::Call, 25, Path::Rsi);
        card.add(Direction::Put, 20, Path::Macd);
        card.dampen(90);
        assert_eq!(card.call_weight(), 22);
        assert_eq!(card.put_weight(), 18);
    }

    #[test]
    fn test_scorecard_ignores_zero_weight() {
        let mut card = Scorecard::new(Branch::Real);
        card.add(Direction::Call, 0, Path::Pattern);
        assert!(!card.has_directional_reading());
    }

    #[test]
    fn test_dominant_path_picks_largest() {
        let mut card = Scorecard::new(Branch::Otc);
        card.add(Direction::Call, 20, Path::Macd);
        card.add(Direction::Call, 25, Path::Pattern);
        card.add(Direction::Put, 50, Path::RsiExtreme);
        assert_eq!(card.dominant_path(Direction::Call), Some(Path::Pattern));
        assert_eq!(card.dominant_path(Direction::Put), Some(Path::RsiExtreme));
    }

    // =========================================================================
    // Resolution Tests
    // =========================================================================

    #[test]
    fn test_resolve_picks_heavier_side() {
        let engine = SignalEngine::default();
        let mut card = Scorecard::new(Branch::Otc);
        card.add(Direction::Call, 50, Path::RsiExtreme);
        card.add(Direction::Put, 20, Path::Macd);
        let signal = engine
            .resolve(&card, &asset("EURUSD_otc"), entry("10:15"))
            .unwrap();
        assert_eq!(signal.direction, Direction::Call);
        assert_eq!(signal.strategy_tag, "OTC_RSI_EXTREME");
        // 88 + min(10, 30 / 5) = 94
        assert_eq!(signal.confidence, 94);
    }

    #[test]
    fn test_resolve_stalemate_uses_tie_break() {
        let engine = SignalEngine::default();
        let mut card = Scorecard::new(Branch::Real);
        card.add(Direction::Call, 25, Path::Rsi);
        card.add(Direction::Put, 25, Path::Pattern);
        let eurusd = asset("EURUSD");
        let signal = engine.resolve(&card, &eurusd, entry("09:30")).unwrap();
        assert_eq!(signal.direction, tie_break(&eurusd, entry("09:30")));
        assert_eq!(signal.strategy_tag, "REAL_TIEBREAK");
        assert_eq!(signal.confidence, 91);
    }

    #[test]
    fn test_resolve_empty_card_is_no_signal() {
        let engine = SignalEngine::default();
        let card = Scorecard::new(Branch::Otc);
        assert!(engine
            .resolve(&card, &asset("EURUSD_otc"), entry("09:30"))
            .is_none());
    }

    #[test]
    fn test_confidence_bounds() {
        let engine = SignalEngine::default();
        for diff in [0, 1, 5, 20, 49, 50, 100, 1000] {
            for branch in [Branch::Otc, Branch::Real] {
                let c = engine.confidence(branch, diff);
                assert!((91..=99).contains(&c), "{branch:?} diff {diff} -> {c}");
            }
        }
        assert_eq!(engine.confidence(Branch::Real, 1000), 98);
    }

    // =========================================================================
    // Tie-break Tests
    // =========================================================================

    #[test]
    fn test_tie_break_deterministic() {
        let a = asset("EUR/USD (OTC)");
        assert_eq!(tie_break(&a, entry("12:34")), tie_break(&a, entry("12:34")));
    }

    #[test]
    fn test_tie_break_roughly_even() {
        let a = asset("GBPJPY_otc");
        let calls = (0..24u8)
            .flat_map(|h| (0..60u8).map(move |m| EntryTime::new(h, m).unwrap()))
            .filter(|e| tie_break(&a, *e) == Direction::Call)
            .count();
        // 1440 minutes; a fair split sits near 720.
        assert!((600..=840).contains(&calls), "calls = {calls}");
    }

    // =========================================================================
    // Branch Tests
    // =========================================================================

    #[test]
    fn test_insufficient_history_is_no_signal() {
        let engine = SignalEngine::default();
        let short = series_from_closes(&[1.0; 19]);
        assert!(engine.analyze(&short, &asset("EURUSD_otc"), entry("10:00")).is_none());
        let real_short = series_from_closes(&[1.0; 29]);
        assert!(engine.analyze(&real_short, &asset("EURUSD"), entry("10:00")).is_none());
    }

    #[test]
    fn test_otc_oversold_is_call() {
        let engine = SignalEngine::default();
        let mut closes = vec![1.10; 36];
        closes.extend((1..=14).map(|i| 1.10 - i as f64 * 0.002));
        let signal = engine
            .analyze(&series_from_closes(&closes), &asset("EURUSD_otc"), entry("10:00"))
            .unwrap();
        assert_eq!(signal.direction, Direction::Call);
        assert!(signal.strategy_tag.starts_with("OTC_"));
    }

    #[test]
    fn test_real_uptrend_is_call() {
        let engine = SignalEngine::default();
        // Gentle uptrend: trend CALL 30 beats RSI PUT 25, ATR ratio stays small.
        let closes: Vec<f64> = (0..40).map(|i| 1.1000 + i as f64 * 0.0001).collect();
        let signal = engine
            .analyze(&series_from_closes(&closes), &asset("EURUSD"), entry("10:00"))
            .unwrap();
        assert_eq!(signal.direction, Direction::Call);
        assert_eq!(signal.strategy_tag, "REAL_TREND");
    }
}
