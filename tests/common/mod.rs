#![allow(dead_code)]

use async_trait::async_trait;
use remote_bloom_rs::{
    BitOp, BitStore, FilterConfig, FilterConfigBuilder, FilterError,
    InMemoryStore, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// In-memory store that can be told to fail batches or expiry refreshes.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub fail_execute: AtomicBool,
    pub fail_expire: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_expire(&self, fail: bool) {
        self.fail_expire.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BitStore for FlakyStore {
    async fn execute(&self, key: &str, ops: &[BitOp]) -> Result<Vec<bool>> {
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(FilterError::StoreUnavailable(
                "connection refused".to_string(),
            ));
        }
        self.inner.execute(key, ops).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        if self.fail_expire.load(Ordering::SeqCst) {
            return Err(FilterError::StoreUnavailable(
                "connection reset".to_string(),
            ));
        }
        self.inner.expire(key, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }
}

pub fn test_config(key: &str, capacity: u64, fpr: f64) -> FilterConfig {
    FilterConfigBuilder::default()
        .key(key)
        .expected_insertions(capacity)
        .false_positive_rate(fpr)
        .build()
        .expect("Failed to build test config")
}

// Helper function to generate consistent test data
pub fn generate_test_items(prefix: &str, count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| format!("{prefix}_{i:06}").into_bytes())
        .collect()
}

/// Redis URL for integration tests; `None` unless `REDIS_URI` is set.
pub fn redis_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("REDIS_URI").ok().filter(|url| !url.is_empty())
}
