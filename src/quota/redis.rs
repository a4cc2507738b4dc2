use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace, warn};

use super::store::CounterStore;
use crate::config::RedisConfig;
use crate::errors::{GeoError, Result};

/// Redis-backed counters.
///
/// Keeps `pool_size` lazily-established multiplexed connections and hands
/// them out round-robin. A connection that errors is dropped and rebuilt on
/// the next use.
pub struct RedisCounterStore {
    client: redis::Client,
    /// 每个槽位一个持久化连接，使用 RwLock 保护
    slots: Vec<RwLock<Option<MultiplexedConnection>>>,
    next: AtomicUsize,
    key_prefix: String,
    timeout: Duration,
}

impl RedisCounterStore {
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let url = config.connection_url();
        let client = redis::Client::open(url.clone())
            .map_err(|e| GeoError::config(format!("invalid redis url '{}': {}", url, e)))?;

        let pool_size = config.pool_size.max(1);
        let slots = (0..pool_size).map(|_| RwLock::new(None)).collect();

        debug!(
            "RedisCounterStore created for {} with {} connections, prefix '{}'",
            url, pool_size, config.key_prefix
        );

        Ok(Self {
            client,
            slots,
            next: AtomicUsize::new(0),
            key_prefix: config.key_prefix.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    /// 获取或建立槽位上的连接
    async fn get_connection(&self, slot: usize) -> redis::RedisResult<MultiplexedConnection> {
        {
            let conn_guard = self.slots[slot].read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.slots[slot].write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established on slot {}", slot);

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self, slot: usize) {
        let mut conn_guard = self.slots[slot].write().await;
        *conn_guard = None;
        debug!("Redis connection on slot {} reset due to error", slot);
    }

    fn pick_slot(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len()
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Round trip a PING; used at startup to warn early about an unreachable server.
    pub async fn ping(&self) -> Result<()> {
        let slot = self.pick_slot();
        let mut conn = self.connection_with_timeout(slot).await?;
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => Ok(()),
            Err(e) => {
                self.reset_connection(slot).await;
                Err(e.into())
            }
        }
    }

    async fn connection_with_timeout(&self, slot: usize) -> Result<MultiplexedConnection> {
        match tokio::time::timeout(self.timeout, self.get_connection(slot)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection(slot).await;
                Err(e.into())
            }
            Err(_) => {
                warn!("Timed out connecting to Redis after {:?}", self.timeout);
                Err(GeoError::store_unavailable("redis connect timeout"))
            }
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let redis_key = self.make_key(key);
        let slot = self.pick_slot();
        let mut conn = self.connection_with_timeout(slot).await?;

        match tokio::time::timeout(self.timeout, conn.incr::<_, _, i64>(&redis_key, 1)).await {
            Ok(Ok(n)) => {
                trace!("INCR {} -> {}", redis_key, n);
                Ok(n)
            }
            Ok(Err(e)) => {
                error!("Failed to INCR '{}': {}", redis_key, e);
                // 连接可能已断开，重置连接
                self.reset_connection(slot).await;
                Err(e.into())
            }
            Err(_) => Err(GeoError::store_unavailable(format!(
                "INCR '{}' timed out",
                redis_key
            ))),
        }
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        let redis_key = self.make_key(key);
        let slot = self.pick_slot();
        let mut conn = self.connection_with_timeout(slot).await?;

        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        match tokio::time::timeout(self.timeout, conn.expire::<_, ()>(&redis_key, seconds)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Failed to EXPIRE '{}': {}", redis_key, e);
                self.reset_connection(slot).await;
                Err(e.into())
            }
            Err(_) => Err(GeoError::store_unavailable(format!(
                "EXPIRE '{}' timed out",
                redis_key
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
