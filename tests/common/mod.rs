//! Shared test fixtures: in-memory dataset source, failing and recording
//! counter stores and a table-driven hostname resolver.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

use geoipd::errors::{GeoError, Result};
use geoipd::geo::{FipsRegion, GeoRecord, RangeIndex, TimezoneIndex, TimezoneRecord};
use geoipd::quota::{CounterStore, MemoryCounterStore};
use geoipd::services::HostResolver;
use geoipd::storage::DatasetSource;

// =============================================================================
// Records
// =============================================================================

pub fn record(range_start: u32, country_code: &str) -> GeoRecord {
    GeoRecord {
        range_start,
        country_code: country_code.to_string(),
        country_name: format!("Country {}", country_code),
        region_code: "00".to_string(),
        ..Default::default()
    }
}

/// `[(0.0.0.0,"A"), (1.0.0.0,"B"), (10.0.0.0,"C")]`
pub fn abc_rows() -> Vec<GeoRecord> {
    vec![
        record(0, "A"),
        record(16_777_216, "B"),
        record(167_772_160, "C"),
    ]
}

pub fn sao_paulo_timezones() -> TimezoneIndex {
    let period = |start: i64, gmtoff: i32, dst: bool| TimezoneRecord {
        timezone_id: 7,
        name: "America/Sao_Paulo".to_string(),
        gmt_offset: gmtoff,
        is_dst: dst,
        abbreviation: if dst { "BRST" } else { "BRT" }.to_string(),
        valid_from: Utc.timestamp_opt(start, 0).unwrap(),
    };

    TimezoneIndex::new(
        vec![FipsRegion {
            country_code: "BR".to_string(),
            region_code: "27".to_string(),
            timezone_id: 7,
        }],
        vec![period(0, -10800, false), period(1_000, -7200, true)],
    )
}

pub fn index_of(rows: Vec<GeoRecord>) -> RangeIndex {
    RangeIndex::build(rows, sao_paulo_timezones()).unwrap()
}

// =============================================================================
// Dataset source
// =============================================================================

/// Dataset source whose contents and modification time are set by the test.
pub struct MockSource {
    rows: Mutex<Option<Vec<GeoRecord>>>,
    mtime: Mutex<Option<SystemTime>>,
    loads: AtomicUsize,
    stats: AtomicUsize,
    load_delay: Mutex<Option<Duration>>,
}

impl MockSource {
    pub fn new(rows: Vec<GeoRecord>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Some(rows)),
            mtime: Mutex::new(Some(Self::at(1))),
            loads: AtomicUsize::new(0),
            stats: AtomicUsize::new(0),
            load_delay: Mutex::new(None),
        })
    }

    pub fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    /// Replace the contents; `None` makes the next load fail.
    pub fn set_rows(&self, rows: Option<Vec<GeoRecord>>) {
        *self.rows.lock() = rows;
    }

    /// `None` makes the next stat fail.
    pub fn set_mtime(&self, mtime: Option<SystemTime>) {
        *self.mtime.lock() = mtime;
    }

    pub fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock() = Some(delay);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetSource for MockSource {
    async fn load_all(&self, _path: &Path) -> Result<RangeIndex> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.load_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let rows = self.rows.lock().clone();
        match rows {
            Some(rows) => RangeIndex::build(rows, sao_paulo_timezones()),
            None => Err(GeoError::dataset_load_failed("corrupt dataset")),
        }
    }

    async fn modified(&self, _path: &Path) -> Result<SystemTime> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        let mtime = *self.mtime.lock();
        mtime.ok_or_else(|| GeoError::dataset_load_failed("stat failed"))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// =============================================================================
// Counter store
// =============================================================================

/// Counter store that is always down.
pub struct DownStore;

#[async_trait]
impl CounterStore for DownStore {
    async fn incr(&self, _key: &str) -> Result<i64> {
        Err(GeoError::store_unavailable("connection refused"))
    }

    async fn expire(&self, _key: &str, _seconds: u64) -> Result<()> {
        Err(GeoError::store_unavailable("connection refused"))
    }

    fn name(&self) -> &'static str {
        "down"
    }
}

/// Memory-backed counter store that records every `expire` call; expiry can
/// be made to fail while increments keep working.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryCounterStore,
    expires: Mutex<Vec<(String, u64)>>,
    fail_expire: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_expire(&self, fail: bool) {
        self.fail_expire.store(fail, Ordering::SeqCst);
    }

    pub fn expires(&self) -> Vec<(String, u64)> {
        self.expires.lock().clone()
    }
}

#[async_trait]
impl CounterStore for RecordingStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        self.inner.incr(key).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        self.expires.lock().push((key.to_string(), seconds));
        if self.fail_expire.load(Ordering::SeqCst) {
            return Err(GeoError::store_unavailable("expire timed out"));
        }
        self.inner.expire(key, seconds).await
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves hostnames from a fixed table; everything else fails.
#[derive(Default)]
pub struct TableResolver {
    pub hosts: HashMap<String, String>,
}

impl TableResolver {
    pub fn with(host: &str, addr: &str) -> Self {
        let mut hosts = HashMap::new();
        hosts.insert(host.to_string(), addr.to_string());
        Self { hosts }
    }
}

#[async_trait]
impl HostResolver for TableResolver {
    async fn resolve(&self, hostname: &str) -> Result<String> {
        self.hosts
            .get(hostname)
            .cloned()
            .ok_or_else(|| GeoError::resolution_failed(format!("{} does not resolve", hostname)))
    }
}
