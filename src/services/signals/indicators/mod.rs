//! Technical indicator implementations.
//!
//! Pure functions over close prices or candles; no I/O and no state.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod pattern;
pub mod rsi;
pub mod sma;
pub mod volatility;

pub use atr::atr;
pub use ema::{ema, ema_series};
pub use macd::{macd, MacdReading};
pub use pattern::{classify_pattern, PatternKind, PatternReading};
pub use rsi::rsi;
pub use sma::sma;
pub use volatility::{is_squeeze, stddev};
