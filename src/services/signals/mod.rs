//! Signal generation.
//!
//! Pure indicator functions, the weighted scoring engine and the
//! deterministic consensus fallback.

pub mod consensus;
pub mod engine;
pub mod indicators;

pub use consensus::{consensus_signal, CONSENSUS_TAG};
pub use engine::{tie_break, Branch, Contribution, Path, Scorecard, SignalEngine};
