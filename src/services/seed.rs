//! Canonical hashing used wherever the system needs reproducible pseudo-randomness.
//!
//! A `Seed` is the SHA-256 digest of its parts joined with `_`, read as a
//! 256-bit big-endian unsigned integer. The synthetic generator, the engine's
//! tie-break and the consensus fallback all derive from this one family, so
//! independent processes agree on every derived value.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed([u8; 32]);

impl Seed {
    /// Hash `parts` joined by `_`.
    pub fn from_parts<S: AsRef<str>>(parts: &[S]) -> Self {
        let joined = parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join("_");
        let digest = Sha256::digest(joined.as_bytes());
        Self(digest.into())
    }

    /// Remainder of the full 256-bit value divided by `modulus`.
    pub fn modulo(&self, modulus: u64) -> u64 {
        if modulus == 0 {
            return 0;
        }
        let m = modulus as u128;
        self.0
            .iter()
            .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % m) as u64
    }

    /// Logical right shift of the 256-bit value.
    pub fn shr(&self, bits: u32) -> Self {
        if bits >= 256 {
            return Self([0; 32]);
        }
        let byte_shift = (bits / 8) as usize;
        let bit_shift = bits % 8;
        let mut out = [0u8; 32];
        for i in (byte_shift..32).rev() {
            let src = i - byte_shift;
            let mut value = self.0[src] >> bit_shift;
            if bit_shift > 0 && src > 0 {
                value |= self.0[src - 1] << (8 - bit_shift);
            }
            out[i] = value;
        }
        Self(out)
    }

    pub fn is_even(&self) -> bool {
        self.0[31] & 1 == 0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_sha256_of_joined_parts() {
        let seed = Seed::from_parts(&["abc"]);
        assert_eq!(
            seed.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(Seed::from_parts(&["a", "b"]), Seed::from_parts(&["a_b"]));
    }

    #[test]
    fn test_modulo_matches_low_byte_for_powers_of_two() {
        let seed = Seed::from_parts(&["abc"]);
        // Digest ends in 0xad.
        assert_eq!(seed.modulo(256), 0xad);
        assert_eq!(seed.modulo(2), 1);
        assert!(!seed.is_even());
        assert_eq!(seed.modulo(0), 0);
    }

    #[test]
    fn test_modulo_small_values() {
        let mut bytes = [0u8; 32];
        bytes[30] = 0x01;
        bytes[31] = 0x2c; // 300
        let seed = Seed(bytes);
        assert_eq!(seed.modulo(1000), 300);
        assert_eq!(seed.modulo(7), 300 % 7);
    }

    #[test]
    fn test_shr() {
        let mut bytes = [0u8; 32];
        bytes[30] = 0x01;
        bytes[31] = 0x2c; // 300
        let seed = Seed(bytes);
        assert_eq!(seed.shr(4).modulo(1_000_000), 300 >> 4);
        assert_eq!(seed.shr(8).modulo(1_000_000), 1);
        assert_eq!(seed.shr(256).modulo(10), 0);
    }

    #[test]
    fn test_shr_carries_across_bytes() {
        let seed = Seed::from_parts(&["EURUSD_otc", "12:00"]);
        let shifted = seed.shr(4);
        // Low nibble of the shifted value is the high nibble of the old last byte.
        assert_eq!(shifted.modulo(16), (seed.0[31] >> 4) as u64);
    }
}
