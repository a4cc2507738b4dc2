use async_trait::async_trait;

use crate::errors::Result;

/// Shared atomic counter store backing the quota gate.
///
/// Implementations provide their own atomicity; failures are reported as
/// [`GeoError::StoreUnavailable`](crate::errors::GeoError::StoreUnavailable).
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key` by one and return the new value.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Set (or refresh) the expiry of `key`.
    async fn expire(&self, key: &str, seconds: u64) -> Result<()>;

    /// 获取 store 名称（用于日志）
    fn name(&self) -> &'static str;
}
