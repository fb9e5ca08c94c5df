use crate::error::{FilterError, Result};
use async_trait::async_trait;
use bitvec::{order::Msb0, vec::BitVec};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// A single bit operation inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    /// Set the bit at `offset`; yields the previous value
    Set { offset: u64, value: bool },
    /// Read the bit at `offset`
    Get { offset: u64 },
}

impl BitOp {
    pub fn offset(&self) -> u64 {
        match *self {
            BitOp::Set { offset, .. } | BitOp::Get { offset } => offset,
        }
    }
}

/// Bit-addressable key-value store holding filter bit arrays.
///
/// Implementations are shared between filters and tasks, so every method
/// takes `&self`. A missing key reads as all zeroes and is created by the
/// first set.
#[async_trait]
pub trait BitStore: Send + Sync {
    /// Executes `ops` against `key` in one exchange with the store and
    /// returns one result per op, in order.
    async fn execute(&self, key: &str, ops: &[BitOp]) -> Result<Vec<bool>>;

    /// Sets (or resets) the time-to-live of `key`. Returns `false` if the
    /// key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Removes the whole bit array. Returns `false` if the key did not exist.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Sets one bit and returns its previous value.
    async fn set_bit(&self, key: &str, offset: u64, value: bool) -> Result<bool> {
        let results = self.execute(key, &[BitOp::Set { offset, value }]).await?;
        single_result(results)
    }

    async fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
        let results = self.execute(key, &[BitOp::Get { offset }]).await?;
        single_result(results)
    }
}

fn single_result(results: Vec<bool>) -> Result<bool> {
    match results.as_slice() {
        [bit] => Ok(*bit),
        other => Err(FilterError::StoreUnavailable(format!(
            "Expected 1 result from store, got {}",
            other.len()
        ))),
    }
}

struct Entry {
    bits: BitVec<u8, Msb0>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Process-local store with the same bit layout and expiry behaviour as
/// Redis strings: offset 0 is the most significant bit of the first byte,
/// arrays grow a byte at a time, expired keys read as missing.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    round_trips: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches (`execute`, `expire`, `delete`) served so far
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// Length in bytes of the live value at `key`, if any
    pub fn byte_len(&self, key: &str) -> Result<Option<usize>> {
        let entries = self.entries.read().map_err(lock_error)?;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.bits.len() / 8))
    }

    /// Number of set bits at `key`
    pub fn count_ones(&self, key: &str) -> Result<usize> {
        let entries = self.entries.read().map_err(lock_error)?;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map_or(0, |entry| entry.bits.count_ones()))
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> FilterError {
    FilterError::StoreUnavailable(format!("In-memory store lock error: {e}"))
}

#[async_trait]
impl BitStore for InMemoryStore {
    async fn execute(&self, key: &str, ops: &[BitOp]) -> Result<Vec<bool>> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().map_err(lock_error)?;
        let now = Instant::now();

        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }

        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let offset = usize::try_from(op.offset()).map_err(|_| {
                FilterError::StoreUnavailable(format!(
                    "Bit offset {} is out of range",
                    op.offset()
                ))
            })?;
            match *op {
                BitOp::Get { .. } => {
                    let bit = entries
                        .get(key)
                        .and_then(|entry| entry.bits.get(offset).map(|b| *b))
                        .unwrap_or(false);
                    results.push(bit);
                }
                BitOp::Set { value, .. } => {
                    let entry =
                        entries.entry(key.to_string()).or_insert_with(|| Entry {
                            bits: BitVec::new(),
                            expires_at: None,
                        });
                    if offset >= entry.bits.len() {
                        let new_len = (offset / 8 + 1) * 8;
                        entry.bits.resize(new_len, false);
                    }
                    let previous = entry.bits.replace(offset, value);
                    results.push(previous);
                }
            }
        }

        Ok(results)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().map_err(lock_error)?;
        let now = Instant::now();

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().map_err(lock_error)?;
        let now = Instant::now();
        Ok(entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }
}
