//! CORS middleware

use actix_cors::Cors;
use actix_web::http::Method;
use tracing::warn;

use crate::api::services::lookup::RATE_LIMIT_HEADERS;
use crate::config::CorsConfig;

/// Build the CORS middleware from configuration.
///
/// `*` allows any origin and echoes it back without credentials. Explicit
/// origins are allowed with credentials. No origins means same-origin only.
pub fn build_cors_middleware(config: &CorsConfig) -> Cors {
    let origins = config.origins();

    let mut cors = Cors::default()
        .allowed_methods([Method::GET, Method::HEAD])
        .expose_headers(RATE_LIMIT_HEADERS)
        .max_age(usize::try_from(config.max_age).unwrap_or(usize::MAX));

    if origins.is_empty() {
        return cors;
    }

    if origins.contains(&"*") {
        if origins.len() > 1 {
            warn!("CORS origin '*' given with other origins; allowing any origin");
        }
        return cors.allow_any_origin();
    }

    for origin in origins {
        cors = cors.allowed_origin(origin);
    }
    cors.supports_credentials()
}
