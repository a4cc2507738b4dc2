//! In-process counter store
//!
//! Single-instance alternative to Redis. Counters live in a `DashMap`; an
//! expired counter restarts from zero on its next increment and is removed
//! by [`MemoryCounterStore::purge_expired`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use super::store::CounterStore;
use crate::errors::Result;

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: i64,
    deadline: Option<Instant>,
}

impl Counter {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

#[derive(Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, Counter>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired counter, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, c| !c.is_expired(now));
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            trace!("Purged {} expired quota counters", removed);
        }
        removed
    }

    /// Spawn the periodic purge task; abort the returned handle to stop it.
    pub fn spawn_purge(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!("Purged {} expired quota counters", purged);
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Instant::now();
        let mut entry = self.counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            deadline: None,
        });

        if entry.is_expired(now) {
            *entry = Counter {
                count: 0,
                deadline: None,
            };
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        if let Some(mut entry) = self.counters.get_mut(key) {
            // 超出 Instant 表示范围时视为永不过期
            entry.deadline = Instant::now().checked_add(Duration::from_secs(seconds));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incr_counts_per_key() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.incr("a").await.unwrap(), 1);
        assert_eq!(store.incr("a").await.unwrap(), 2);
        assert_eq!(store.incr("b").await.unwrap(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_counter_restarts() {
        let store = MemoryCounterStore::new();
        store.incr("a").await.unwrap();
        store.incr("a").await.unwrap();
        store.expire("a", 0).await.unwrap();

        assert_eq!(store.incr("a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryCounterStore::new();
        store.incr("old").await.unwrap();
        store.expire("old", 0).await.unwrap();
        store.incr("fresh").await.unwrap();
        store.expire("fresh", 3600).await.unwrap();

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_runs_on_interval() {
        let store = Arc::new(MemoryCounterStore::new());
        store.incr("old").await.unwrap();
        store.expire("old", 0).await.unwrap();

        let task = store.spawn_purge(Duration::from_secs(60));
        tokio::task::yield_now().await;
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(store.is_empty());
        task.abort();
    }

    #[tokio::test]
    async fn test_huge_expiry_never_expires() {
        let store = MemoryCounterStore::new();
        store.incr("a").await.unwrap();
        store.expire("a", u64::MAX).await.unwrap();

        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.incr("a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expire_on_missing_key_is_noop() {
        let store = MemoryCounterStore::new();
        store.expire("missing", 10).await.unwrap();
        assert!(store.is_empty());
    }
}
