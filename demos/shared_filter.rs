//! Two "workers" deduplicating a stream of emails through one Redis-backed
//! filter. Falls back to an in-process store when Redis is unreachable.
//!
//! Run with `RUST_LOG=debug REDIS_URI=redis://127.0.0.1/ cargo run --example shared_filter`.
use remote_bloom_rs::{
    BitStore, BloomFilterOps, BloomFilterStats, BulkBloomFilterOps, FilterConfig,
    InMemoryStore, RedisStore, RemoteBloomFilter, common::bits2hr,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const EMAILS: [&str; 6] = [
    "user1@example.com",
    "user2@example.com",
    "user3@example.com",
    "user2@example.com",
    "user4@example.com",
    "user1@example.com",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = FilterConfig::from_env()?;
    let redis_url = std::env::var("REDIS_URI")
        .unwrap_or_else(|_| "redis://127.0.0.1/".to_string());

    let store: Arc<dyn BitStore> = match RedisStore::connect(redis_url.as_str()).await
    {
        Ok(store) => {
            info!(url = %redis_url, "Connected to Redis");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "Redis unavailable, using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    // Each worker builds its own handle; they only share the remote key.
    let worker_a = RemoteBloomFilter::with_store(config.clone(), store.clone())?;
    let worker_b = RemoteBloomFilter::with_store(config, store)?;
    worker_a.clear().await?;

    info!(
        key = worker_a.key(),
        size = %bits2hr(worker_a.bit_count()),
        hash_rounds = worker_a.hash_rounds(),
        "Filter ready"
    );

    for (i, email) in EMAILS.iter().enumerate() {
        let worker = if i % 2 == 0 { &worker_a } else { &worker_b };
        if worker.query(email.as_bytes()).await? {
            println!("duplicate: {email}");
        } else {
            worker.insert(email.as_bytes()).await?;
            println!("new:       {email}");
        }
    }

    let probes: Vec<&[u8]> = vec![
        b"user1@example.com".as_slice(),
        b"nobody@example.com".as_slice(),
    ];
    let answers = worker_b.query_bulk(&probes).await?;
    for (probe, present) in probes.iter().zip(answers) {
        println!(
            "{} -> {}",
            String::from_utf8_lossy(probe),
            if present { "possibly present" } else { "absent" }
        );
    }

    worker_a.clear().await?;
    Ok(())
}
