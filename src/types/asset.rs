use serde::{Deserialize, Serialize};
use std::fmt;

/// Markers that flag an asset label as an OTC instrument, matched case-insensitively.
const OTC_MARKERS: &[&str] = &["(OTC)", "-OTC", "_OTC"];

/// Normalized asset identity.
///
/// The canonical `symbol` is uppercase with whitespace, `/`, `-` and `_`
/// removed, so `"eur/usd (otc)"`, `"EURUSD_otc"` and `"EUR-USD-OTC"` all map
/// to `EURUSD` with `is_otc` set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetIdentity {
    pub symbol: String,
    pub is_otc: bool,
}

impl AssetIdentity {
    /// Parse a raw asset label. Returns `None` if nothing is left after normalization.
    pub fn parse(label: &str) -> Option<Self> {
        let mut upper = label.trim().to_uppercase();
        let mut is_otc = false;

        for marker in OTC_MARKERS {
            if upper.contains(marker) {
                upper = upper.replace(marker, "");
                is_otc = true;
            }
        }
        if let Some(stripped) = upper.trim_end().strip_suffix(" OTC") {
            upper = stripped.to_string();
            is_otc = true;
        }

        let symbol: String = upper
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '/' | '-' | '_'))
            .collect();

        if symbol.is_empty() {
            return None;
        }

        Some(Self { symbol, is_otc })
    }

    /// Cache and hashing key. OTC and real variants of a pair never collide.
    pub fn cache_key(&self) -> String {
        if self.is_otc {
            format!("{}_otc", self.symbol)
        } else {
            self.symbol.clone()
        }
    }

    /// Pair name in the form broker bridges expect (`EURUSD`, `EURUSD_otc`).
    pub fn bridge_pair(&self) -> String {
        self.cache_key()
    }

    /// Split a six-letter pair into base and quote (`EURUSD` -> `EUR`, `USD`).
    pub fn currency_pair(&self) -> Option<(&str, &str)> {
        if self.symbol.len() == 6 && self.symbol.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(self.symbol.split_at(3))
        } else {
            None
        }
    }
}

impl fmt::Display for AssetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_otc {
            write!(f, "{} (OTC)", self.symbol)
        } else {
            write!(f, "{}", self.symbol)
        }
    }
}
