//! Global metrics registry
//!
//! Defines all Prometheus metrics used in the application.

use once_cell::sync::Lazy;
use prometheus::{CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::error;

/// Global metrics instance; `None` if registration failed at first use.
pub static METRICS: Lazy<Option<Metrics>> = Lazy::new(|| match Metrics::new() {
    Ok(metrics) => Some(metrics),
    Err(e) => {
        error!("Failed to register metrics, export disabled: {}", e);
        None
    }
});

/// Application metrics container
pub struct Metrics {
    /// Internal Prometheus registry
    registry: Registry,

    // ===== Dataset metrics =====
    /// Dataset events (`loaded`, `failed`)
    pub dataset_events_total: CounterVec,
    /// Ranges in the published snapshot
    pub dataset_ranges: Gauge,

    // ===== Request metrics =====
    /// Quota decisions (`admit`, `reject`, `unavailable`)
    pub quota_decisions_total: CounterVec,
    /// Lookups by kind (`geo`, `timezone`) and HTTP status
    pub lookups_total: CounterVec,

    // ===== System metrics =====
    /// Server uptime in seconds
    pub uptime_seconds: Gauge,
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let dataset_events_total = CounterVec::new(
            Opts::new("geoipd_dataset_events_total", "Dataset events"),
            &["event"],
        )?;
        let dataset_ranges = Gauge::new(
            "geoipd_dataset_ranges",
            "Number of ranges in the published dataset",
        )?;
        let quota_decisions_total = CounterVec::new(
            Opts::new("geoipd_quota_decisions_total", "Quota decisions"),
            &["decision"],
        )?;
        let lookups_total = CounterVec::new(
            Opts::new("geoipd_lookups_total", "Lookups by kind and status"),
            &["kind", "status"],
        )?;
        let uptime_seconds = Gauge::new("geoipd_uptime_seconds", "Server uptime in seconds")?;

        registry.register(Box::new(dataset_events_total.clone()))?;
        registry.register(Box::new(dataset_ranges.clone()))?;
        registry.register(Box::new(quota_decisions_total.clone()))?;
        registry.register(Box::new(lookups_total.clone()))?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self {
            registry,
            dataset_events_total,
            dataset_ranges,
            quota_decisions_total,
            lookups_total,
            uptime_seconds,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_registered_metrics() {
        let metrics = METRICS.as_ref().unwrap();
        metrics
            .dataset_events_total
            .with_label_values(&["loaded"])
            .inc();
        metrics.dataset_ranges.set(3.0);

        let output = metrics.export().unwrap();
        assert!(output.contains("geoipd_dataset_events_total{event=\"loaded\"}"));
        assert!(output.contains("geoipd_dataset_ranges 3"));
    }
}
