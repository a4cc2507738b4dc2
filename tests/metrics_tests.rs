//! Metrics tests
//!
//! These tests require the `metrics` feature to be enabled:
//!   cargo test --features metrics --test metrics_tests

#![cfg(feature = "metrics")]

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use common::{DownStore, MockSource, abc_rows, index_of, record};
use geoipd::metrics::METRICS;
use geoipd::quota::{MemoryCounterStore, QuotaGate};
use geoipd::storage::{DatasetHandle, DatasetSource, ReloadOutcome};

fn dataset_events(event: &str) -> f64 {
    METRICS
        .as_ref()
        .unwrap()
        .dataset_events_total
        .with_label_values(&[event])
        .get()
}

fn quota_decisions(decision: &str) -> f64 {
    METRICS
        .as_ref()
        .unwrap()
        .quota_decisions_total
        .with_label_values(&[decision])
        .get()
}

#[tokio::test]
async fn test_dataset_events_are_counted() {
    let source = MockSource::new(abc_rows());
    let dyn_source: Arc<dyn DatasetSource> = source.clone();
    let handle = DatasetHandle::new(index_of(abc_rows()), dyn_source, "mock.sqlite");
    handle.tick().await;

    let loaded = dataset_events("loaded");
    source.set_rows(Some(vec![record(0, "Z")]));
    source.set_mtime(Some(MockSource::at(2)));
    assert_eq!(handle.tick().await, ReloadOutcome::Reloaded);
    assert!(dataset_events("loaded") >= loaded + 1.0);
    assert_eq!(METRICS.as_ref().unwrap().dataset_ranges.get(), 1.0);

    let failed = dataset_events("failed");
    source.set_rows(None);
    source.set_mtime(Some(MockSource::at(3)));
    assert_eq!(handle.tick().await, ReloadOutcome::Failed);
    assert!(dataset_events("failed") >= failed + 1.0);
}

#[tokio::test]
async fn test_quota_decisions_are_counted() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

    let rejected = quota_decisions("reject");
    let gate = QuotaGate::new(Arc::new(MemoryCounterStore::new()), 60, 0);
    gate.check_at("a", now).await;
    assert!(quota_decisions("reject") >= rejected + 1.0);

    let unavailable = quota_decisions("unavailable");
    let gate = QuotaGate::new(Arc::new(DownStore), 60, 10);
    gate.check_at("a", now).await;
    assert!(quota_decisions("unavailable") >= unavailable + 1.0);
}
