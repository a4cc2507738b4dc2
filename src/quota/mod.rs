//! Per-client request quota
//!
//! One counter per client per calendar minute, kept in a shared
//! [`CounterStore`]. Every check increments the bucket and refreshes its
//! expiry, so a bucket never expires mid-burst while traffic continues.
//!
//! When the store is unreachable the gate fails closed: the request is
//! rejected as unavailable instead of being admitted unmetered.

pub mod memory;
pub mod redis;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use tracing::{trace, warn};

pub use memory::MemoryCounterStore;
pub use self::redis::RedisCounterStore;
pub use store::CounterStore;

use crate::config::QuotaConfig;
use crate::errors::{GeoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Admit,
    Reject,
    /// The counter store could not be reached.
    Unavailable,
}

impl QuotaDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaDecision::Admit => "admit",
            QuotaDecision::Reject => "reject",
            QuotaDecision::Unavailable => "unavailable",
        }
    }

    /// Map the decision onto the request error taxonomy.
    pub fn into_result(self, client: &str) -> Result<()> {
        match self {
            QuotaDecision::Admit => Ok(()),
            QuotaDecision::Reject => Err(GeoError::quota_exceeded(format!(
                "client {} is over quota",
                client
            ))),
            QuotaDecision::Unavailable => {
                Err(GeoError::store_unavailable("quota store unavailable"))
            }
        }
    }
}

/// Counter state reported to clients as `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaUsage {
    pub limit: u64,
    pub remaining: u64,
    /// Seconds until the current minute bucket rolls over.
    pub reset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    pub decision: QuotaDecision,
    /// `None` when the store could not be reached.
    pub usage: Option<QuotaUsage>,
}

impl QuotaCheck {
    fn unavailable() -> Self {
        Self {
            decision: QuotaDecision::Unavailable,
            usage: None,
        }
    }
}

#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn CounterStore>,
    expire_seconds: u64,
    max_requests: u64,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn CounterStore>, expire_seconds: u64, max_requests: u64) -> Self {
        Self {
            store,
            expire_seconds,
            max_requests,
        }
    }

    pub fn from_config(store: Arc<dyn CounterStore>, config: &QuotaConfig) -> Self {
        Self::new(store, config.expire_seconds, config.max_requests)
    }

    /// `quota:{client}:{YYYY}:{MM}:{DD}:{HH}:{mm}`
    pub fn bucket_key(client: &str, now: DateTime<Utc>) -> String {
        format!("quota:{}:{}", client, now.format("%Y:%m:%d:%H:%M"))
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub async fn check(&self, client: &str) -> QuotaDecision {
        self.evaluate(client).await.decision
    }

    pub async fn check_at(&self, client: &str, now: DateTime<Utc>) -> QuotaDecision {
        self.evaluate_at(client, now).await.decision
    }

    /// Like [`check`](Self::check), also reporting the counter state.
    pub async fn evaluate(&self, client: &str) -> QuotaCheck {
        self.evaluate_at(client, Utc::now()).await
    }

    pub async fn evaluate_at(&self, client: &str, now: DateTime<Utc>) -> QuotaCheck {
        let result = self.count_at(client, now).await;
        inc_counter!(quota_decisions_total, &[result.decision.as_str()]);
        result
    }

    async fn count_at(&self, client: &str, now: DateTime<Utc>) -> QuotaCheck {
        let key = Self::bucket_key(client, now);

        let count = match self.store.incr(&key).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Quota store error: key: {} - msg: {}", key, e);
                return QuotaCheck::unavailable();
            }
        };

        // 每次检查都刷新过期时间，包括被拒绝的请求
        if let Err(e) = self.store.expire(&key, self.expire_seconds).await {
            warn!("Quota store error: key: {} - msg: {}", key, e);
            return QuotaCheck::unavailable();
        }

        let used = u64::try_from(count).unwrap_or(0);
        let usage = QuotaUsage {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(used),
            reset: 60 - u64::from(now.second().min(59)),
        };

        let decision = if used > self.max_requests {
            trace!("Quota exceeded for {}: {} requests", client, count);
            QuotaDecision::Reject
        } else {
            QuotaDecision::Admit
        };

        QuotaCheck {
            decision,
            usage: Some(usage),
        }
    }
}
