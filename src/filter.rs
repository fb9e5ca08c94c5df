use crate::common::bits2hr;
use crate::config::{FilterConfig, FilterParams};
use crate::error::{FilterError, Result};
use crate::hash::{HashStrategy, bit_positions};
use crate::store::{BitOp, BitStore};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Single-element operations against the shared bit array
#[async_trait]
pub trait BloomFilterOps {
    /// Sets the item's bits. On success the item will query as present
    /// until the key expires or is cleared.
    async fn insert(&self, item: &[u8]) -> Result<()>;
    /// `true` means "possibly present", `false` means "definitely absent".
    async fn query(&self, item: &[u8]) -> Result<bool>;
    /// Drops the whole bit array.
    async fn clear(&self) -> Result<()>;
}

/// Many items in one round trip
#[async_trait]
pub trait BulkBloomFilterOps {
    async fn insert_bulk(&self, items: &[&[u8]]) -> Result<()>;
    async fn query_bulk(&self, items: &[&[u8]]) -> Result<Vec<bool>>;
}

pub trait BloomFilterStats {
    fn capacity(&self) -> u64;
    fn false_positive_rate(&self) -> f64;
    fn bit_count(&self) -> u64;
    fn hash_rounds(&self) -> u32;
}

/// Bloom filter whose bits live in a shared [`BitStore`].
///
/// The handle holds only immutable configuration and a shared reference to
/// the store, so it can be cloned and used from many tasks at once. Every
/// call re-reads the store; nothing is cached locally.
#[derive(Clone)]
pub struct RemoteBloomFilter {
    config: FilterConfig,
    params: FilterParams,
    store: Arc<dyn BitStore>,
}

impl RemoteBloomFilter {
    /// Validates `config`, then checks that a store was supplied.
    ///
    /// Errors are reported in order: capacity, error rate, key, store.
    pub fn new(
        config: FilterConfig,
        store: Option<Arc<dyn BitStore>>,
    ) -> Result<Self> {
        config.validate()?;
        let store = store.ok_or(FilterError::MissingStore)?;

        let params = FilterParams::from(&config);
        info!(
            key = %config.key,
            bits = params.bit_count,
            size = %bits2hr(params.bit_count),
            hash_rounds = params.hash_rounds,
            strategy = %config.hash_strategy,
            "Created remote bloom filter"
        );

        Ok(Self {
            config,
            params,
            store,
        })
    }

    pub fn with_store(
        config: FilterConfig,
        store: Arc<dyn BitStore>,
    ) -> Result<Self> {
        Self::new(config, Some(store))
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn params(&self) -> FilterParams {
        self.params
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn expiry(&self) -> Option<Duration> {
        self.config.expiry
    }

    pub fn hash_strategy(&self) -> HashStrategy {
        self.config.hash_strategy
    }

    /// Bit offsets this filter touches for `item`
    pub fn positions(&self, item: &[u8]) -> Vec<u64> {
        bit_positions(
            item,
            self.params.hash_rounds,
            self.params.bit_count,
            self.config.hash_strategy,
        )
    }

    fn set_ops(&self, item: &[u8]) -> Vec<BitOp> {
        self.positions(item)
            .into_iter()
            .map(|offset| BitOp::Set {
                offset,
                value: true,
            })
            .collect()
    }

    fn get_ops(&self, item: &[u8]) -> Vec<BitOp> {
        self.positions(item)
            .into_iter()
            .map(|offset| BitOp::Get { offset })
            .collect()
    }

    async fn run_batch(&self, ops: &[BitOp]) -> Result<Vec<bool>> {
        let results = self.store.execute(&self.config.key, ops).await?;
        if results.len() != ops.len() {
            return Err(FilterError::StoreUnavailable(format!(
                "Store returned {} results for {} operations",
                results.len(),
                ops.len()
            )));
        }
        Ok(results)
    }

    /// Best effort: the bits are already in the store when this runs.
    async fn refresh_expiry(&self) -> Result<()> {
        let Some(ttl) = self.config.expiry else {
            return Ok(());
        };

        match self.store.expire(&self.config.key, ttl).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(key = %self.config.key, "Key vanished before expiry refresh");
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.config.key, error = %e, "Expiry refresh failed");
                Err(FilterError::ExpiryRefreshFailed {
                    key: self.config.key.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl BloomFilterOps for RemoteBloomFilter {
    async fn insert(&self, item: &[u8]) -> Result<()> {
        let ops = self.set_ops(item);
        self.run_batch(&ops).await?;
        self.refresh_expiry().await
    }

    async fn query(&self, item: &[u8]) -> Result<bool> {
        let ops = self.get_ops(item);
        let bits = self.run_batch(&ops).await?;
        Ok(bits.iter().all(|&bit| bit))
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.store.delete(&self.config.key).await?;
        debug!(key = %self.config.key, removed, "Cleared remote bloom filter");
        Ok(())
    }
}

#[async_trait]
impl BulkBloomFilterOps for RemoteBloomFilter {
    async fn insert_bulk(&self, items: &[&[u8]]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let ops: Vec<BitOp> =
            items.iter().flat_map(|item| self.set_ops(item)).collect();
        self.run_batch(&ops).await?;
        debug!(key = %self.config.key, items = items.len(), "Bulk insert");
        self.refresh_expiry().await
    }

    async fn query_bulk(&self, items: &[&[u8]]) -> Result<Vec<bool>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let ops: Vec<BitOp> =
            items.iter().flat_map(|item| self.get_ops(item)).collect();
        let bits = self.run_batch(&ops).await?;

        let k = self.params.hash_rounds as usize;
        Ok(bits
            .chunks(k)
            .map(|chunk| chunk.iter().all(|&bit| bit))
            .collect())
    }
}

impl BloomFilterStats for RemoteBloomFilter {
    fn capacity(&self) -> u64 {
        self.config.expected_insertions
    }

    fn false_positive_rate(&self) -> f64 {
        self.config.false_positive_rate
    }

    fn bit_count(&self) -> u64 {
        self.params.bit_count
    }

    fn hash_rounds(&self) -> u32 {
        self.params.hash_rounds
    }
}

impl fmt::Debug for RemoteBloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBloomFilter")
            .field("key", &self.config.key)
            .field("bit_count", &self.params.bit_count)
            .field("size", &bits2hr(self.params.bit_count))
            .field("hash_rounds", &self.params.hash_rounds)
            .field("hash_strategy", &self.config.hash_strategy)
            .field("expiry", &self.config.expiry)
            .finish_non_exhaustive()
    }
}
