use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, trace};

use super::MetricsService;
use crate::services::LookupService;
use crate::storage::ReloadStatus;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthDatasetCheck {
    pub path: String,
    pub ranges: usize,
    pub loaded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub reload: ReloadStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthQuotaCheck {
    pub backend: &'static str,
    pub max_requests: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: u64,
    pub dataset: HealthDatasetCheck,
    pub quota: HealthQuotaCheck,
    pub response_time_ms: u32,
}

/// Health Service
///
/// 不经过配额检查，直接读取数据集快照和 reload 状态。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        service: web::Data<LookupService>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let handle = service.dataset();
        let snapshot = handle.get();
        let reload = handle.status();

        // 最近一次 reload 失败时仍然在用旧快照提供服务
        let status = if reload.last_error.is_some() {
            "degraded"
        } else {
            "healthy"
        };

        let now = Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        let body = HealthResponse {
            status,
            timestamp: now.to_rfc3339(),
            uptime,
            dataset: HealthDatasetCheck {
                path: handle.path().display().to_string(),
                ranges: snapshot.len(),
                loaded_at: snapshot.loaded_at(),
                reload,
            },
            quota: HealthQuotaCheck {
                backend: service.quota().store_name(),
                max_requests: service.quota().max_requests(),
            },
            response_time_ms: start_time.elapsed().as_millis() as u32,
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            status,
            uptime
        );

        HttpResponse::Ok()
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(body)
    }

    // 活跃性检查
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
        .route("/metrics", web::get().to(MetricsService::metrics))
}
