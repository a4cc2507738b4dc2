//! Response renderers
//!
//! Geo and timezone results are served as CSV, XML or JSON (optionally
//! wrapped as JSONP). Field order is fixed and identical across formats.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::{GeoError, Result};
use crate::geo::TimezoneRecord;
use crate::services::Located;

/// 回调名最大长度
pub const MAX_CALLBACK_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Xml,
    Json,
}

impl FromStr for Format {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(Format::Csv),
            "xml" => Ok(Format::Xml),
            "json" => Ok(Format::Json),
            other => Err(GeoError::invalid_input(format!(
                "unsupported format '{}'",
                other
            ))),
        }
    }
}

/// Rendered body plus the content type it must be served with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, Serialize)]
struct GeoBody<'a> {
    ip: &'a str,
    country_code: &'a str,
    country_name: &'a str,
    region_code: &'a str,
    region_name: &'a str,
    city: &'a str,
    zipcode: &'a str,
    latitude: f64,
    longitude: f64,
    metro_code: &'a str,
    area_code: &'a str,
}

impl<'a> From<&'a Located> for GeoBody<'a> {
    fn from(located: &'a Located) -> Self {
        let r = &located.record;
        Self {
            ip: &located.ip,
            country_code: &r.country_code,
            country_name: &r.country_name,
            region_code: &r.region_code,
            region_name: &r.region_name,
            city: &r.city,
            zipcode: &r.postal_code,
            latitude: r.latitude,
            longitude: r.longitude,
            metro_code: &r.metro_code,
            area_code: &r.area_code,
        }
    }
}

#[derive(Debug, Serialize)]
struct TimezoneBody<'a> {
    timezone: &'a str,
    gmtoff: i32,
    isdst: bool,
}

impl<'a> From<&'a TimezoneRecord> for TimezoneBody<'a> {
    fn from(tz: &'a TimezoneRecord) -> Self {
        Self {
            timezone: &tz.name,
            gmtoff: tz.gmt_offset,
            isdst: tz.is_dst,
        }
    }
}

/// Check a JSONP callback name: `[A-Za-z_$][A-Za-z0-9_$.]*`, at most 64 chars.
pub fn validate_callback(callback: &str) -> Result<()> {
    let mut chars = callback.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.');

    if callback.len() <= MAX_CALLBACK_LEN && head_ok && tail_ok {
        Ok(())
    } else {
        Err(GeoError::invalid_input(format!(
            "invalid callback name '{}'",
            callback
        )))
    }
}

pub fn render_geo(format: Format, located: &Located, callback: Option<&str>) -> Result<Rendered> {
    let body = GeoBody::from(located);
    match format {
        Format::Csv => render_csv(&body),
        Format::Json => render_json(&body, callback),
        Format::Xml => {
            let lat = body.latitude.to_string();
            let lon = body.longitude.to_string();
            Ok(render_xml(&[
                ("Ip", body.ip),
                ("CountryCode", body.country_code),
                ("CountryName", body.country_name),
                ("RegionCode", body.region_code),
                ("RegionName", body.region_name),
                ("City", body.city),
                ("ZipCode", body.zipcode),
                ("Latitude", &lat),
                ("Longitude", &lon),
                ("MetroCode", body.metro_code),
                ("AreaCode", body.area_code),
            ]))
        }
    }
}

pub fn render_timezone(
    format: Format,
    tz: &TimezoneRecord,
    callback: Option<&str>,
) -> Result<Rendered> {
    let body = TimezoneBody::from(tz);
    match format {
        Format::Csv => render_csv(&body),
        Format::Json => render_json(&body, callback),
        Format::Xml => {
            let gmtoff = body.gmtoff.to_string();
            let isdst = body.isdst.to_string();
            Ok(render_xml(&[
                ("Timezone", body.timezone),
                ("Gmtoff", &gmtoff),
                ("Isdst", &isdst),
            ]))
        }
    }
}

fn render_csv<T: Serialize>(body: &T) -> Result<Rendered> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .serialize(body)
        .map_err(|e| GeoError::internal(format!("csv encoding failed: {}", e)))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| GeoError::internal(format!("csv encoding failed: {}", e)))?;

    Ok(Rendered {
        content_type: "text/csv",
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

fn render_json<T: Serialize>(body: &T, callback: Option<&str>) -> Result<Rendered> {
    let json = serde_json::to_string(body)
        .map_err(|e| GeoError::internal(format!("json encoding failed: {}", e)))?;
    match callback.filter(|cb| !cb.is_empty()) {
        Some(cb) => {
            validate_callback(cb)?;
            Ok(Rendered {
                content_type: "text/javascript",
                body: format!("{}({});", cb, json),
            })
        }
        None => Ok(Rendered {
            content_type: "application/json",
            body: json,
        }),
    }
}

fn render_xml(fields: &[(&str, &str)]) -> Rendered {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");
    for (tag, value) in fields {
        let _ = writeln!(out, "\t<{tag}>{}</{tag}>", escape_xml(value));
    }
    out.push_str("</Response>\n");

    Rendered {
        content_type: "text/xml",
        body: out,
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoRecord;
    use chrono::Utc;

    fn sample() -> Located {
        Located {
            ip: "8.8.8.8".to_string(),
            record: GeoRecord {
                range_start: 0x0808_0800,
                country_code: "US".to_string(),
                country_name: "United States".to_string(),
                region_code: "CA".to_string(),
                region_name: "California".to_string(),
                city: "Mountain View, \"HQ\"".to_string(),
                postal_code: "94043".to_string(),
                latitude: 37.386,
                longitude: -122.0838,
                metro_code: "807".to_string(),
                area_code: "650".to_string(),
            },
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("csv".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("xml".parse::<Format>().unwrap(), Format::Xml);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert!("yaml".parse::<Format>().is_err());
    }

    #[test]
    fn test_callback_validation() {
        assert!(validate_callback("cb").is_ok());
        assert!(validate_callback("$jq.cb_1").is_ok());
        assert!(validate_callback("1cb").is_err());
        assert!(validate_callback("alert(1)").is_err());
        assert!(validate_callback(&"a".repeat(65)).is_err());
        assert!(validate_callback(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_csv_quotes_fields() {
        let out = render_geo(Format::Csv, &sample(), None).unwrap();
        assert_eq!(out.content_type, "text/csv");
        assert_eq!(
            out.body,
            "8.8.8.8,US,United States,CA,California,\"Mountain View, \"\"HQ\"\"\",94043,37.386,-122.0838,807,650\n"
        );
    }

    #[test]
    fn test_csv_encoding_failure_is_server_error() {
        #[derive(Serialize)]
        struct Nested {
            fields: std::collections::BTreeMap<String, String>,
        }

        let body = Nested {
            fields: [("a".to_string(), "b".to_string())].into(),
        };
        let err = render_csv(&body).unwrap_err();
        assert!(matches!(err, GeoError::Internal(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_json_and_jsonp() {
        let out = render_geo(Format::Json, &sample(), None).unwrap();
        assert_eq!(out.content_type, "application/json");
        let value: serde_json::Value = serde_json::from_str(&out.body).unwrap();
        assert_eq!(value["zipcode"], "94043");
        assert_eq!(value["latitude"], 37.386);

        let out = render_geo(Format::Json, &sample(), Some("cb")).unwrap();
        assert_eq!(out.content_type, "text/javascript");
        assert!(out.body.starts_with("cb({"));
        assert!(out.body.ends_with("});"));

        assert!(render_geo(Format::Json, &sample(), Some("x y")).is_err());
    }

    #[test]
    fn test_xml_escapes() {
        let out = render_geo(Format::Xml, &sample(), None).unwrap();
        assert_eq!(out.content_type, "text/xml");
        assert!(out.body.contains("<Response>"));
        assert!(out.body.contains("<City>Mountain View, &quot;HQ&quot;</City>"));
        assert!(out.body.contains("<ZipCode>94043</ZipCode>"));
    }

    #[test]
    fn test_timezone_formats() {
        let tz = TimezoneRecord {
            timezone_id: 1,
            name: "America/Sao_Paulo".to_string(),
            gmt_offset: -10800,
            is_dst: false,
            abbreviation: "BRT".to_string(),
            valid_from: Utc::now(),
        };

        let csv = render_timezone(Format::Csv, &tz, None).unwrap();
        assert_eq!(csv.body, "America/Sao_Paulo,-10800,false\n");

        let json = render_timezone(Format::Json, &tz, None).unwrap();
        assert_eq!(
            json.body,
            r#"{"timezone":"America/Sao_Paulo","gmtoff":-10800,"isdst":false}"#
        );

        let xml = render_timezone(Format::Xml, &tz, None).unwrap();
        assert!(xml.body.contains("<Gmtoff>-10800</Gmtoff>"));
    }
}
