use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{QuotaBackend, StaticConfig, get_config};
use crate::quota::{CounterStore, MemoryCounterStore, QuotaGate, RedisCounterStore};
use crate::services::{LookupService, SystemResolver};
use crate::storage::{DatasetFactory, DatasetHandle};

/// 内存计数器过期清理间隔
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub struct StartupContext {
    pub dataset: Arc<DatasetHandle>,
    pub lookup_service: LookupService,
    /// Background tasks to stop on shutdown.
    pub tasks: Vec<JoinHandle<()>>,
}

/// 准备服务器启动的上下文
/// 包括数据集、配额计数器和后台任务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = get_config();
    let mut tasks = Vec::new();

    let dataset = DatasetFactory::open()
        .await
        .with_context(|| format!("Failed to open dataset {}", config.dataset.path))?;

    if config.dataset.reload_interval > 0 {
        let interval = Duration::from_secs(config.dataset.reload_interval);
        tasks.push(dataset.spawn_autoreload(interval));
        debug!(
            "Dataset autoreload every {} seconds",
            config.dataset.reload_interval
        );
    } else {
        warn!("Dataset autoreload is disabled (reload_interval = 0)");
    }

    let (store, purge_task) = create_counter_store(&config).await?;
    tasks.extend(purge_task);

    let quota = QuotaGate::from_config(store, &config.quota);
    info!(
        "Quota: {} requests per client per {} seconds ({} backend)",
        config.quota.max_requests,
        config.quota.expire_seconds,
        quota.store_name()
    );

    let lookup_service = LookupService::new(
        dataset.clone(),
        quota,
        Arc::new(SystemResolver::default()),
    );

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        dataset,
        lookup_service,
        tasks,
    })
}

/// 根据配置创建配额计数器后端
async fn create_counter_store(
    config: &StaticConfig,
) -> Result<(Arc<dyn CounterStore>, Option<JoinHandle<()>>)> {
    match config.quota.backend {
        QuotaBackend::Redis => {
            let store = RedisCounterStore::new(&config.redis)
                .context("Failed to create Redis counter store")?;

            // Redis 不可用时不阻止启动，配额检查会返回 503 直到恢复
            match store.ping().await {
                Ok(()) => info!("Redis counter store connected"),
                Err(e) => warn!(
                    "Redis is not reachable yet: {}. Lookups will fail until it is.",
                    e
                ),
            }

            let store: Arc<dyn CounterStore> = Arc::new(store);
            Ok((store, None))
        }
        QuotaBackend::Memory => {
            warn!("Using in-memory quota counters; counts are per-process and lost on restart");
            let store = Arc::new(MemoryCounterStore::new());
            let purge_task = store.spawn_purge(MEMORY_PURGE_INTERVAL);

            let store: Arc<dyn CounterStore> = store;
            Ok((store, Some(purge_task)))
        }
    }
}
