//! Geo and timezone lookup endpoints

use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::api::render::{self, Format, Rendered, validate_callback};
use crate::errors::{GeoError, Result};
use crate::geo::timezone::DEFAULT_REGION_CODE;
use crate::quota::QuotaUsage;
use crate::services::{LookupService, Metered};
use crate::utils::client_identity;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
pub const RATE_LIMIT_HEADERS: [&str; 3] =
    [RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET];

/// Request-independent API settings, resolved once at startup.
#[derive(Clone, Debug, Default)]
pub struct ApiSettings {
    /// 信任 X-Forwarded-For / X-Real-IP
    pub trust_xheaders: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub callback: Option<String>,
}

impl CallbackQuery {
    fn callback(&self) -> Option<&str> {
        self.callback.as_deref().filter(|cb| !cb.is_empty())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    error: &'static str,
    message: &'a str,
}

/// Build the error response for a failed request.
pub fn error_response(err: &GeoError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected: {}", err);
    }

    HttpResponse::build(status).json(ErrorBody {
        code: err.code(),
        error: err.error_type(),
        message: err.message(),
    })
}

fn ok_response(rendered: Rendered) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(rendered.content_type)
        .body(rendered.body)
}

fn insert_usage_headers(resp: &mut HttpResponse, usage: &QuotaUsage) {
    let headers = resp.headers_mut();
    for (name, value) in [
        (RATE_LIMIT_LIMIT, usage.limit),
        (RATE_LIMIT_REMAINING, usage.remaining),
        (RATE_LIMIT_RESET, usage.reset),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    }
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn respond(kind: &'static str, metered: Metered<Rendered>) -> HttpResponse {
    let Metered { usage, result } = metered;
    let mut resp = match result {
        Ok(rendered) => ok_response(rendered),
        Err(e) => error_response(&e),
    };
    if let Some(usage) = usage {
        insert_usage_headers(&mut resp, &usage);
    }
    inc_counter!(lookups_total, &[kind, resp.status().as_str()]);
    resp
}

/// Country codes are one or two uppercase letters.
fn validate_country_code(code: &str) -> Result<()> {
    if (1..=2).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(GeoError::invalid_input(format!(
            "invalid country code '{}'",
            code
        )))
    }
}

/// Region codes are one or two uppercase letters or digits.
fn validate_region_code(code: &str) -> Result<()> {
    if (1..=2).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        Ok(())
    } else {
        Err(GeoError::invalid_input(format!(
            "invalid region code '{}'",
            code
        )))
    }
}

pub struct GeoApiService;

impl GeoApiService {
    /// `GET /{csv|xml|json}/{address}`
    pub async fn lookup_address(
        req: HttpRequest,
        path: web::Path<(String, String)>,
        query: web::Query<CallbackQuery>,
        service: web::Data<LookupService>,
        settings: web::Data<ApiSettings>,
    ) -> HttpResponse {
        let (format, address) = path.into_inner();
        let client = client_identity(&req, settings.trust_xheaders);
        trace!("Lookup '{}' for client {}", address, client);

        respond(
            "geo",
            Self::do_lookup_address(&service, &client, &format, &address, query.callback()).await,
        )
    }

    async fn do_lookup_address(
        service: &LookupService,
        client: &str,
        format: &str,
        address: &str,
        callback: Option<&str>,
    ) -> Metered<Rendered> {
        if let Err(e) = Self::check_request(format, callback) {
            return Metered {
                usage: None,
                result: Err(e),
            };
        }

        let Metered { usage, result } = service.lookup_address_metered(client, address).await;
        let result = result.and_then(|located| {
            let format: Format = format.parse()?;
            render::render_geo(format, &located, callback)
        });
        Metered { usage, result }
    }

    /// Format and callback are validated before the request is metered.
    fn check_request(format: &str, callback: Option<&str>) -> Result<()> {
        format.parse::<Format>()?;
        if let Some(cb) = callback {
            validate_callback(cb)?;
        }
        Ok(())
    }

    /// `GET /tz/{csv|xml|json}/{country_code}/{region_code}`
    pub async fn lookup_timezone(
        req: HttpRequest,
        path: web::Path<(String, String, String)>,
        query: web::Query<CallbackQuery>,
        service: web::Data<LookupService>,
        settings: web::Data<ApiSettings>,
    ) -> HttpResponse {
        let (format, country_code, region_code) = path.into_inner();
        let client = client_identity(&req, settings.trust_xheaders);

        respond(
            "timezone",
            Self::do_lookup_timezone(
                &service,
                &client,
                &format,
                &country_code,
                &region_code,
                query.callback(),
            )
            .await,
        )
    }

    /// `GET /tz/{csv|xml|json}/{country_code}`, region defaults to `00`.
    pub async fn lookup_country_timezone(
        req: HttpRequest,
        path: web::Path<(String, String)>,
        query: web::Query<CallbackQuery>,
        service: web::Data<LookupService>,
        settings: web::Data<ApiSettings>,
    ) -> HttpResponse {
        let (format, country_code) = path.into_inner();
        let client = client_identity(&req, settings.trust_xheaders);

        respond(
            "timezone",
            Self::do_lookup_timezone(
                &service,
                &client,
                &format,
                &country_code,
                DEFAULT_REGION_CODE,
                query.callback(),
            )
            .await,
        )
    }

    async fn do_lookup_timezone(
        service: &LookupService,
        client: &str,
        format: &str,
        country_code: &str,
        region_code: &str,
        callback: Option<&str>,
    ) -> Metered<Rendered> {
        let checked = Self::check_request(format, callback)
            .and_then(|()| validate_country_code(country_code))
            .and_then(|()| validate_region_code(region_code));
        if let Err(e) = checked {
            return Metered {
                usage: None,
                result: Err(e),
            };
        }

        let Metered { usage, result } = service
            .lookup_timezone_metered(client, country_code, region_code)
            .await;
        let result = result
            .inspect_err(|e| {
                if matches!(e, GeoError::NotFound(_)) {
                    warn!("No timezone for {}/{}", country_code, region_code);
                }
            })
            .and_then(|tz| {
                let format: Format = format.parse()?;
                render::render_timezone(format, &tz, callback)
            });
        Metered { usage, result }
    }
}

/// Lookup 路由配置
pub fn lookup_routes() -> actix_web::Scope {
    web::scope("")
        .route(
            "/tz/{format:(csv|xml|json)}/{country_code}/{region_code}",
            web::get().to(GeoApiService::lookup_timezone),
        )
        .route(
            "/tz/{format:(csv|xml|json)}/{country_code}",
            web::get().to(GeoApiService::lookup_country_timezone),
        )
        .route(
            "/{format:(csv|xml|json)}/{address:.*}",
            web::get().to(GeoApiService::lookup_address),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_rules() {
        assert!(validate_country_code("BR").is_ok());
        assert!(validate_country_code("A").is_ok());
        assert!(validate_country_code("br").is_err());
        assert!(validate_country_code("BRA").is_err());
        assert!(validate_country_code("").is_err());
        assert!(validate_country_code("B1").is_err());
    }

    #[test]
    fn test_region_code_rules() {
        assert!(validate_region_code("27").is_ok());
        assert!(validate_region_code("CA").is_ok());
        assert!(validate_region_code("00").is_ok());
        assert!(validate_region_code("ca").is_err());
        assert!(validate_region_code("123").is_err());
    }

    #[test]
    fn test_error_response_status() {
        let resp = error_response(&GeoError::quota_exceeded("over"));
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = error_response(&GeoError::store_unavailable("down"));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_usage_headers_on_rejection() {
        let resp = respond(
            "geo",
            Metered {
                usage: Some(QuotaUsage {
                    limit: 10,
                    remaining: 0,
                    reset: 42,
                }),
                result: Err(GeoError::quota_exceeded("over")),
            },
        );
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        assert_eq!(header("X-RateLimit-Limit").as_deref(), Some("10"));
        assert_eq!(header("X-RateLimit-Remaining").as_deref(), Some("0"));
        assert_eq!(header("X-RateLimit-Reset").as_deref(), Some("42"));
    }

    #[test]
    fn test_no_usage_headers_when_store_is_down() {
        let resp = respond(
            "geo",
            Metered {
                usage: None,
                result: Err(GeoError::store_unavailable("down")),
            },
        );
        assert!(resp.headers().get(RATE_LIMIT_LIMIT).is_none());
    }
}
