use fnv::FnvHasher;
use murmur3::murmur3_x64_128;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;
use std::io::Cursor;
use std::str::FromStr;
use xxhash_rust::xxh64::xxh64;

use crate::error::FilterError;

const GOLDEN_RATIO_64: u64 = 0x9e37_79b9_7f4a_7c15;
const GOLDEN_RATIO_32: u32 = 0x9e37_79b9;

/// Hash function family used to derive bit positions.
///
/// Every variant is a pure function of `(item, round)`. The strategy is fixed
/// for the lifetime of a filter key: positions written with one strategy are
/// meaningless to a filter reading with another.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    /// xxHash64, seeded per round.
    #[default]
    XxHash,
    /// Murmur3 x64/128, lower 64 bits, seeded per round.
    Murmur3,
    /// FNV-1a 64 over a round prefix and the item.
    Fnv,
}

impl HashStrategy {
    pub fn hash(&self, item: &[u8], round: u32) -> u64 {
        match self {
            HashStrategy::XxHash => {
                xxh64(item, u64::from(round).wrapping_mul(GOLDEN_RATIO_64))
            }
            HashStrategy::Murmur3 => {
                let seed = round.wrapping_mul(GOLDEN_RATIO_32);
                let mut cursor = Cursor::new(item);
                murmur3_x64_128(&mut cursor, seed)
                    .expect("Failed to compute Murmur3 hash")
                    as u64
            }
            HashStrategy::Fnv => {
                let mut hasher = FnvHasher::default();
                hasher.write(&round.to_le_bytes());
                hasher.write(item);
                hasher.finish()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashStrategy::XxHash => "xxhash",
            HashStrategy::Murmur3 => "murmur3",
            HashStrategy::Fnv => "fnv",
        }
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashStrategy {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xxhash" | "xxh64" | "xx" => Ok(HashStrategy::XxHash),
            "murmur3" | "murmur" => Ok(HashStrategy::Murmur3),
            "fnv" | "fnv1a" => Ok(HashStrategy::Fnv),
            other => Err(FilterError::InvalidConfig(format!(
                "Unknown hash strategy '{other}'"
            ))),
        }
    }
}

/// Derives `num_hashes` bit positions in `[0, bit_count)` by double hashing:
/// `h1 + i * h2 (mod m)`, with `h2` forced odd so the step never shares the
/// factor 2 with a power-of-two `m`.
///
/// `bit_count` must be non-zero.
pub fn bit_positions(
    item: &[u8],
    num_hashes: u32,
    bit_count: u64,
    strategy: HashStrategy,
) -> Vec<u64> {
    debug_assert!(bit_count > 0, "bit_count must be positive");

    let h1 = strategy.hash(item, 0);
    let mut h2 = strategy.hash(item, 1);
    if h2 % 2 == 0 {
        h2 = h2.wrapping_add(1);
    }

    (0..u64::from(num_hashes))
        .map(|i| h1.wrapping_add(i.wrapping_mul(h2)) % bit_count)
        .collect()
}

/// `m = ceil(-n * ln(p) / ln(2)^2)`
pub fn optimal_bit_count(n: u64, fpr: f64) -> u64 {
    let ln2 = std::f64::consts::LN_2;
    ((-(n as f64) * fpr.ln()) / (ln2 * ln2)).ceil() as u64
}

/// `k = ceil(m / n * ln(2))`, never less than one round.
pub fn optimal_hash_rounds(n: u64, m: u64) -> u32 {
    let k = ((m as f64 / n as f64) * std::f64::consts::LN_2).ceil() as u32;
    k.max(1)
}
