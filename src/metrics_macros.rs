//! Metrics helper macros
//!
//! Expand to nothing unless the `metrics` feature is enabled, so call sites
//! need no `cfg` of their own.

/// Increment a CounterVec field of the global registry.
///
/// Usage:
/// ```ignore
/// inc_counter!(dataset_events_total, &["loaded"]);
/// ```
macro_rules! inc_counter {
    ($field:ident, $labels:expr) => {
        #[cfg(feature = "metrics")]
        if let Some(m) = $crate::metrics::METRICS.as_ref() {
            m.$field.with_label_values($labels).inc();
        }
    };
}

/// Set a plain Gauge field of the global registry.
///
/// Usage:
/// ```ignore
/// set_plain_gauge!(dataset_ranges, index.len() as f64);
/// ```
macro_rules! set_plain_gauge {
    ($field:ident, $value:expr) => {
        #[cfg(feature = "metrics")]
        if let Some(m) = $crate::metrics::METRICS.as_ref() {
            m.$field.set($value);
        }
    };
}
