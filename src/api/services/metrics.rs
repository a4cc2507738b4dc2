//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus text format at `/health/metrics`.

use actix_web::{HttpResponse, Responder};

#[cfg(feature = "metrics")]
use actix_web::web;

#[cfg(feature = "metrics")]
use super::AppStartTime;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Metrics service handler
pub struct MetricsService;

impl MetricsService {
    /// Handle metrics export request
    #[cfg(feature = "metrics")]
    pub async fn metrics(app_start_time: web::Data<AppStartTime>) -> impl Responder {
        let Some(metrics) = METRICS.as_ref() else {
            return HttpResponse::ServiceUnavailable()
                .content_type("text/plain")
                .body("Metrics registry unavailable");
        };

        let uptime = (chrono::Utc::now() - app_start_time.start_datetime)
            .num_seconds()
            .max(0) as f64;
        metrics.uptime_seconds.set(uptime);

        match metrics.export() {
            Ok(output) => HttpResponse::Ok()
                .content_type("text/plain; version=0.0.4; charset=utf-8")
                .body(output),
            Err(e) => {
                tracing::error!("Failed to encode metrics: {}", e);
                HttpResponse::InternalServerError().finish()
            }
        }
    }

    /// Metrics not available when feature is disabled
    #[cfg(not(feature = "metrics"))]
    pub async fn metrics() -> impl Responder {
        HttpResponse::NotFound()
            .content_type("text/plain")
            .body("Metrics not enabled. Rebuild with --features metrics")
    }
}
