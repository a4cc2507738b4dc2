//! Hot-swappable dataset handle
//!
//! The handle publishes one immutable [`RangeIndex`] at a time through an
//! `ArcSwap`. Readers take their own `Arc` for the duration of a lookup, so a
//! reload replaces the pointer without waiting for them; the previous
//! snapshot is freed when its last reader drops it.
//!
//! The autoreload task stats the source on a fixed interval and rebuilds the
//! snapshot whenever the modification time changes. A failed rebuild is
//! logged and the current snapshot keeps serving.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::source::DatasetSource;
use crate::errors::Result;
use crate::geo::RangeIndex;

/// Result of one autoreload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// First successful stat; mtime recorded, nothing reloaded.
    Seeded,
    Unchanged,
    Reloaded,
    /// The source could not be stat'ed.
    StatFailed,
    /// The source changed but the new snapshot failed to build.
    Failed,
}

/// Reload bookkeeping exposed to the health endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReloadStatus {
    pub generation: u64,
    pub last_observed_mtime: Option<DateTime<Utc>>,
    pub last_reload_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct ReloadState {
    last_observed_mtime: Option<SystemTime>,
    generation: u64,
    last_reload_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

pub struct DatasetHandle {
    current: ArcSwap<RangeIndex>,
    source: Arc<dyn DatasetSource>,
    path: PathBuf,
    state: Mutex<ReloadState>,
    /// 同一时间只允许一个 reload 在执行
    reload_lock: tokio::sync::Mutex<()>,
}

impl DatasetHandle {
    /// Wrap an already-built snapshot. The first [`tick`](Self::tick) seeds
    /// the observed modification time.
    pub fn new(index: RangeIndex, source: Arc<dyn DatasetSource>, path: impl Into<PathBuf>) -> Self {
        Self {
            current: ArcSwap::from_pointee(index),
            source,
            path: path.into(),
            state: Mutex::new(ReloadState::default()),
            reload_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Stat and load the dataset at startup; the startup stat seeds the
    /// observed modification time.
    pub async fn open(source: Arc<dyn DatasetSource>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mtime = source.modified(path).await?;
        let index = source.load_all(path).await?;

        info!(
            "Dataset opened from {} ({} source, {} ranges)",
            path.display(),
            source.name(),
            index.len()
        );

        inc_counter!(dataset_events_total, &["loaded"]);
        set_plain_gauge!(dataset_ranges, index.len() as f64);

        let handle = Self::new(index, source, path);
        handle.state.lock().last_observed_mtime = Some(mtime);
        Ok(handle)
    }

    /// The currently published snapshot.
    #[inline]
    pub fn get(&self) -> Arc<RangeIndex> {
        self.current.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> ReloadStatus {
        let state = self.state.lock();
        ReloadStatus {
            generation: state.generation,
            last_observed_mtime: state.last_observed_mtime.map(DateTime::<Utc>::from),
            last_reload_at: state.last_reload_at,
            last_error: state.last_error.clone(),
        }
    }

    /// Run one autoreload step. Never fails; every problem is logged and
    /// reported through the returned outcome.
    pub async fn tick(&self) -> ReloadOutcome {
        let _guard = self.reload_lock.lock().await;

        let mtime = match self.source.modified(&self.path).await {
            Ok(mtime) => mtime,
            Err(e) => {
                warn!("Dataset autoreload: cannot stat {}: {}", self.path.display(), e);
                return ReloadOutcome::StatFailed;
            }
        };

        let previous = self.state.lock().last_observed_mtime;
        match previous {
            None => {
                self.state.lock().last_observed_mtime = Some(mtime);
                info!("Dataset autoreload task initialized");
                return ReloadOutcome::Seeded;
            }
            Some(seen) if seen == mtime => {
                debug!("Dataset unchanged, skipping reload");
                return ReloadOutcome::Unchanged;
            }
            Some(_) => {}
        }

        info!(
            "Dataset {} changed on disk, reloading...",
            self.path.display()
        );

        // 新索引必须完整构建并校验后才能发布
        match self.source.load_all(&self.path).await {
            Ok(index) => {
                let ranges = index.len();
                self.current.store(Arc::new(index));
                inc_counter!(dataset_events_total, &["loaded"]);
                set_plain_gauge!(dataset_ranges, ranges as f64);

                let mut state = self.state.lock();
                state.last_observed_mtime = Some(mtime);
                state.generation += 1;
                state.last_reload_at = Some(Utc::now());
                state.last_error = None;

                info!(
                    "Dataset reload complete: generation {}, {} ranges",
                    state.generation, ranges
                );
                ReloadOutcome::Reloaded
            }
            Err(e) => {
                error!(
                    "Dataset reload failed, keeping current dataset: {}",
                    e
                );
                inc_counter!(dataset_events_total, &["failed"]);
                self.state.lock().last_error = Some(e.to_string());
                ReloadOutcome::Failed
            }
        }
    }

    /// Spawn the periodic autoreload task.
    ///
    /// The task only holds a weak reference and exits once the handle is
    /// dropped; abort the returned `JoinHandle` to stop it earlier.
    pub fn spawn_autoreload(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        info!("Dataset autoreload every {:?}", interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval 的第一次 tick 立即完成，跳过
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(handle) = weak.upgrade() else {
                    debug!("Dataset handle dropped, stopping autoreload");
                    break;
                };
                handle.tick().await;
            }
        })
    }
}
