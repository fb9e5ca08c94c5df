use crate::error::{FilterError, Result};
use crate::store::{BitOp, BitStore};
use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{Client, IntoConnectionInfo};
use std::time::Duration;
use tracing::debug;

/// [`BitStore`] backed by Redis strings (`SETBIT` / `GETBIT` / `PEXPIRE`).
///
/// Works over any cloneable async connection: a [`ConnectionManager`] for a
/// single node or a [`ClusterConnection`] for Redis Cluster. Each batch is
/// sent as one pipeline, so a filter key must map to a single slot; use a
/// hash tag such as `{users}:seen` to group related filters.
#[derive(Clone)]
pub struct RedisStore<C = ConnectionManager> {
    conn: C,
}

impl RedisStore<ConnectionManager> {
    /// Connects to a single Redis node, reconnecting automatically on failure.
    pub async fn connect<T: IntoConnectionInfo>(redis_url: T) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            FilterError::StoreUnavailable(format!("Redis connection error: {e}"))
        })?;
        let conn = client.get_connection_manager().await.map_err(|e| {
            FilterError::StoreUnavailable(format!("Redis connection error: {e}"))
        })?;
        Ok(Self { conn })
    }
}

impl RedisStore<ClusterConnection> {
    /// Connects to a Redis Cluster through any of its seed nodes.
    pub async fn connect_cluster<T: IntoConnectionInfo>(
        nodes: Vec<T>,
    ) -> Result<Self> {
        let client = ClusterClient::new(nodes).map_err(|e| {
            FilterError::StoreUnavailable(format!(
                "Redis cluster connection error: {e}"
            ))
        })?;
        let conn = client.get_async_connection().await.map_err(|e| {
            FilterError::StoreUnavailable(format!(
                "Redis cluster connection error: {e}"
            ))
        })?;
        Ok(Self { conn })
    }
}

impl<C> RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    /// Wraps an existing connection. The caller keeps control of its setup.
    pub fn from_connection(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> BitStore for RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn execute(&self, key: &str, ops: &[BitOp]) -> Result<Vec<bool>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for op in ops {
            match *op {
                BitOp::Set { offset, value } => {
                    pipe.cmd("SETBIT").arg(key).arg(offset).arg(u8::from(value));
                }
                BitOp::Get { offset } => {
                    pipe.cmd("GETBIT").arg(key).arg(offset);
                }
            }
        }

        let mut conn = self.conn.clone();
        let replies: Vec<i64> = pipe.query_async(&mut conn).await.map_err(|e| {
            FilterError::StoreUnavailable(format!("Redis error: {e}"))
        })?;

        if replies.len() != ops.len() {
            return Err(FilterError::StoreUnavailable(format!(
                "Redis pipeline returned {} replies for {} commands",
                replies.len(),
                ops.len()
            )));
        }
        debug!(key, ops = ops.len(), "Executed bit pipeline");

        Ok(replies.into_iter().map(|bit| bit == 1).collect())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let millis = i64::try_from(ttl.as_millis()).map_err(|_| {
            FilterError::InvalidConfig(format!("Expiry {ttl:?} is too large"))
        })?;

        let mut conn = self.conn.clone();
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                FilterError::StoreUnavailable(format!("Redis error: {e}"))
            })?;
        Ok(updated == 1)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                FilterError::StoreUnavailable(format!("Redis error: {e}"))
            })?;
        Ok(removed > 0)
    }
}
