//! Geo and timezone records

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const RESERVED_COUNTRY_CODE: &str = "RD";
pub const RESERVED_COUNTRY_NAME: &str = "Reserved";

/// Location data attached to one range start. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GeoRecord {
    pub range_start: u32,
    pub country_code: String,
    pub country_name: String,
    pub region_code: String,
    pub region_name: String,
    pub city: String,
    pub postal_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub metro_code: String,
    pub area_code: String,
}

impl GeoRecord {
    /// The canonical record returned for reserved addresses.
    pub fn reserved(range_start: u32) -> Self {
        Self {
            range_start,
            country_code: RESERVED_COUNTRY_CODE.to_string(),
            country_name: RESERVED_COUNTRY_NAME.to_string(),
            ..Default::default()
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.country_code == RESERVED_COUNTRY_CODE && self.country_name == RESERVED_COUNTRY_NAME
    }

    pub fn from_payload(range_start: u32, payload: GeoPayload) -> Self {
        Self {
            range_start,
            country_code: payload.country_code,
            country_name: payload.country_name,
            region_code: payload.region_code,
            region_name: payload.region_name,
            city: payload.city,
            postal_code: payload.zipcode,
            latitude: payload.latitude,
            longitude: payload.longitude,
            metro_code: payload.metro_code,
            area_code: payload.area_code,
        }
    }
}

/// JSON payload stored next to each range start in the dataset file.
///
/// `country_code` and `region_code` are join keys and must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPayload {
    #[serde(deserialize_with = "de_text")]
    pub country_code: String,
    #[serde(default, deserialize_with = "de_text")]
    pub country_name: String,
    #[serde(deserialize_with = "de_text")]
    pub region_code: String,
    #[serde(default, deserialize_with = "de_text")]
    pub region_name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub city: String,
    #[serde(default, alias = "postal_code", deserialize_with = "de_text")]
    pub zipcode: String,
    #[serde(default, deserialize_with = "de_coordinate")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "de_coordinate")]
    pub longitude: f64,
    #[serde(default, alias = "metrocode", deserialize_with = "de_text")]
    pub metro_code: String,
    #[serde(default, alias = "areacode", deserialize_with = "de_text")]
    pub area_code: String,
}

/// 接受字符串、数字或 null
fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected text, got {}", other))),
    }
}

/// 接受数字或数字字符串，空值视为 0
fn de_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("coordinate out of range")),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(0.0),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| D::Error::custom(format!("invalid coordinate '{}': {}", s, e))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(D::Error::custom(format!(
            "expected coordinate, got {}",
            other
        ))),
    }
}

/// One offset period of a timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimezoneRecord {
    pub timezone_id: i64,
    /// Display name from the `timezones` table, e.g. `America/Sao_Paulo`.
    pub name: String,
    pub gmt_offset: i32,
    pub is_dst: bool,
    pub abbreviation: String,
    pub valid_from: DateTime<Utc>,
}

/// (country_code, region_code) → timezone id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FipsRegion {
    pub country_code: String,
    pub region_code: String,
    pub timezone_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accepts_mixed_types() {
        let json = r#"{
            "country_code": "BR", "country_name": "Brazil",
            "region_code": 27, "region_name": "Sao Paulo",
            "city": "Sao Paulo", "zipcode": "",
            "latitude": "-23.5", "longitude": -46.6167,
            "metro_code": null, "area_code": 11
        }"#;
        let payload: GeoPayload = serde_json::from_str(json).unwrap();
        let record = GeoRecord::from_payload(42, payload);
        assert_eq!(record.range_start, 42);
        assert_eq!(record.region_code, "27");
        assert_eq!(record.latitude, -23.5);
        assert_eq!(record.longitude, -46.6167);
        assert_eq!(record.metro_code, "");
        assert_eq!(record.area_code, "11");
    }

    #[test]
    fn test_payload_requires_join_keys() {
        let json = r#"{"country_code": "BR", "city": "Sao Paulo"}"#;
        assert!(serde_json::from_str::<GeoPayload>(json).is_err());
        let json = r#"{"region_code": "27"}"#;
        assert!(serde_json::from_str::<GeoPayload>(json).is_err());
    }

    #[test]
    fn test_reserved_record() {
        let record = GeoRecord::reserved(7);
        assert!(record.is_reserved());
        assert_eq!(record.country_code, "RD");
        assert_eq!(record.city, "");
        assert_eq!(record.latitude, 0.0);
    }
}
