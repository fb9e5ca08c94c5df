//! Bloom filter whose bit array lives in a shared, bit-addressable store
//! (Redis), so that many processes can answer "have I seen X before?"
//! against one filter without talking to each other.
//!
//! HowTo:
//!    * Sizing: `expected_insertions` and `false_positive_rate` give the bit
//!      array size `m` and the number of hash rounds `k`.
//!    * Positions: two base hashes `h1`, `h2` of the item are combined as
//!      `h1 + i * h2 (mod m)` for `i` in `0..k`, with `h2` forced odd.
//!
//! Insertion:
//!     * All `k` `SETBIT` commands go to the store in one pipeline.
//!     * If an expiry is configured, the key's TTL is refreshed afterwards.
//! Query:
//!     * All `k` `GETBIT` commands go in one pipeline; the item is possibly
//!       present only if every bit is set.
//!
//! Obvious problems:
//!     * The `k` bits of one insert are not applied atomically, so a query
//!       racing an insert of the same item may briefly see it as absent.
//!     * The hash strategy must never change for an existing key.
//!     * Store failures are returned as errors, never as "absent".

pub mod common;
mod config;
mod error;
mod filter;
mod hash;
#[cfg(feature = "redis")]
mod redis_store;
mod store;

pub use config::{
    FilterConfig, FilterConfigBuilder, FilterConfigBuilderError, FilterParams,
};
pub use error::{FilterError, Result};
pub use filter::{
    BloomFilterOps, BloomFilterStats, BulkBloomFilterOps, RemoteBloomFilter,
};
pub use hash::{
    HashStrategy, bit_positions, optimal_bit_count, optimal_hash_rounds,
};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use store::{BitOp, BitStore, InMemoryStore};
