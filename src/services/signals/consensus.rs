//! Deterministic consensus fallback for when the engine declines to signal.

use crate::config::EngineConfig;
use crate::services::seed::Seed;
use crate::types::{AssetIdentity, Direction, EntryTime, Signal};

pub const CONSENSUS_TAG: &str = "CONSENSUS_FALLBACK";

/// Signal derived from `Seed(asset, "HH:MM", "consensus")`.
///
/// Every process computes the same direction and confidence for a given
/// asset and entry minute.
pub fn consensus_signal(asset: &AssetIdentity, entry_time: EntryTime, config: &EngineConfig) -> Signal {
    let seed = Seed::from_parts(&[asset.cache_key(), entry_time.to_string(), "consensus".to_string()]);
    let spread = config.consensus_spread.max(1) as u64;
    let confidence = (config.confidence_lower as u64 + seed.modulo(spread))
        .min(config.confidence_upper.max(config.confidence_lower) as u64) as u8;

    Signal {
        direction: Direction::from_parity(seed.modulo(2)),
        confidence,
        strategy_tag: CONSENSUS_TAG.to_string(),
        entry_time,
    }
}
