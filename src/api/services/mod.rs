pub mod health;
pub mod lookup;
pub mod metrics;

pub use health::{AppStartTime, HealthService, health_routes};
pub use lookup::{ApiSettings, GeoApiService, lookup_routes};
pub use metrics::MetricsService;
