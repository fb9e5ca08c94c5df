//! Runs against a live Redis when `REDIS_URI` is set (e.g. `redis://127.0.0.1/`),
//! and against a cluster when `REDIS_CLUSTER_NODES` lists comma-separated seeds.
//! Without them every test returns early.
#![cfg(feature = "redis")]

mod common;

use common::{generate_test_items, redis_url, test_config};
use remote_bloom_rs::{
    BitStore, BloomFilterOps, BulkBloomFilterOps, FilterConfigBuilder,
    HashStrategy, RedisStore, RemoteBloomFilter,
};
use std::sync::Arc;
use std::time::Duration;

async fn redis_store() -> Option<Arc<RedisStore>> {
    let Some(url) = redis_url() else {
        eprintln!("REDIS_URI not set, skipping Redis integration test");
        return None;
    };
    Some(Arc::new(
        RedisStore::connect(url.as_str())
            .await
            .expect("REDIS_URI is set but Redis is unreachable"),
    ))
}

async fn fresh_key(store: &RedisStore, key: &str) -> String {
    store.delete(key).await.expect("Failed to delete test key");
    key.to_string()
}

#[tokio::test]
async fn test_redis_insert_and_query() {
    let Some(store) = redis_store().await else {
        return;
    };
    let key = fresh_key(&store, "integration:test:basic").await;
    let filter =
        RemoteBloomFilter::with_store(test_config(&key, 1000, 0.01), store.clone())
            .unwrap();

    assert!(!filter.query(b"integration_test_data").await.unwrap());
    filter.insert(b"integration_test_data").await.unwrap();
    assert!(filter.query(b"integration_test_data").await.unwrap());

    for offset in filter.positions(b"integration_test_data") {
        assert!(store.get_bit(&key, offset).await.unwrap());
    }

    filter.clear().await.unwrap();
    assert!(!filter.query(b"integration_test_data").await.unwrap());
}

#[tokio::test]
async fn test_redis_false_positive_rate() {
    let Some(store) = redis_store().await else {
        return;
    };
    let key = fresh_key(&store, "integration:test:fpr").await;
    let filter =
        RemoteBloomFilter::with_store(test_config(&key, 1000, 0.01), store.clone())
            .unwrap();

    let inserted = generate_test_items("integration_element", 1000);
    let refs: Vec<&[u8]> = inserted.iter().map(Vec::as_slice).collect();
    filter.insert_bulk(&refs).await.unwrap();
    assert!(filter.query_bulk(&refs).await.unwrap().iter().all(|&b| b));

    let unseen = generate_test_items("integration_unseen_element", 1000);
    let unseen_refs: Vec<&[u8]> = unseen.iter().map(Vec::as_slice).collect();
    let false_positives = filter
        .query_bulk(&unseen_refs)
        .await
        .unwrap()
        .into_iter()
        .filter(|&present| present)
        .count();

    let observed = false_positives as f64 / unseen.len() as f64;
    assert!(observed <= 0.02, "Observed FPR {observed} exceeds 0.02");

    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_redis_hash_strategies() {
    let Some(store) = redis_store().await else {
        return;
    };
    for strategy in [HashStrategy::XxHash, HashStrategy::Murmur3, HashStrategy::Fnv] {
        let key =
            fresh_key(&store, &format!("integration:hash:{strategy}")).await;
        let config = FilterConfigBuilder::default()
            .key(key.clone())
            .expected_insertions(1000)
            .hash_strategy(strategy)
            .build()
            .unwrap();
        let filter = RemoteBloomFilter::with_store(config, store.clone()).unwrap();

        filter.insert(b"integration_hash_test").await.unwrap();
        assert!(filter.query(b"integration_hash_test").await.unwrap());
        store.delete(&key).await.unwrap();
    }
}

#[tokio::test]
async fn test_redis_expiry() {
    let Some(store) = redis_store().await else {
        return;
    };
    let key = fresh_key(&store, "integration:test:ttl").await;
    let config = FilterConfigBuilder::default()
        .key(key)
        .expected_insertions(1000)
        .expiry(Duration::from_secs(1))
        .build()
        .unwrap();
    let filter = RemoteBloomFilter::with_store(config, store).unwrap();

    filter.insert(b"integration_ttl_test").await.unwrap();
    assert!(filter.query(b"integration_ttl_test").await.unwrap());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!filter.query(b"integration_ttl_test").await.unwrap());
}

#[tokio::test]
async fn test_redis_cluster_hash_tagged_keys() {
    dotenvy::dotenv().ok();
    let Ok(nodes) = std::env::var("REDIS_CLUSTER_NODES") else {
        eprintln!("REDIS_CLUSTER_NODES not set, skipping cluster test");
        return;
    };
    let nodes: Vec<String> = nodes.split(',').map(|n| n.trim().to_string()).collect();
    let store = Arc::new(
        RedisStore::connect_cluster(nodes)
            .await
            .expect("REDIS_CLUSTER_NODES is set but the cluster is unreachable"),
    );

    let key = "{integration}:cluster:basic";
    store.delete(key).await.unwrap();
    let filter =
        RemoteBloomFilter::with_store(test_config(key, 1000, 0.01), store.clone())
            .unwrap();

    let items = generate_test_items("cluster", 100);
    for item in &items {
        filter.insert(item).await.unwrap();
    }
    for item in &items {
        assert!(filter.query(item).await.unwrap());
    }
    store.delete(key).await.unwrap();
}
