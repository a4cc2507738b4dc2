//! Timezone tables
//!
//! FIPS region → timezone id, then timezone id → offset periods ordered by
//! the instant they take effect.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::record::{FipsRegion, TimezoneRecord};

/// Region code used when the caller did not supply one.
pub const DEFAULT_REGION_CODE: &str = "00";

#[derive(Debug, Default)]
pub struct TimezoneIndex {
    regions: HashMap<(String, String), i64>,
    /// 按 valid_from 升序
    periods: HashMap<i64, Vec<TimezoneRecord>>,
}

impl TimezoneIndex {
    pub fn new(regions: Vec<FipsRegion>, periods: Vec<TimezoneRecord>) -> Self {
        let regions = regions
            .into_iter()
            .map(|r| ((r.country_code, r.region_code), r.timezone_id))
            .collect();

        let mut grouped: HashMap<i64, Vec<TimezoneRecord>> = HashMap::new();
        for period in periods {
            grouped.entry(period.timezone_id).or_default().push(period);
        }
        for list in grouped.values_mut() {
            list.sort_by_key(|p| p.valid_from);
        }

        Self {
            regions,
            periods: grouped,
        }
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn timezone_id(&self, country_code: &str, region_code: &str) -> Option<i64> {
        let region_code = if region_code.is_empty() {
            DEFAULT_REGION_CODE
        } else {
            region_code
        };
        self.regions
            .get(&(country_code.to_string(), region_code.to_string()))
            .copied()
    }

    /// The period of the region's timezone in effect at `now`: the greatest
    /// `valid_from` that is not after `now`.
    pub fn lookup(
        &self,
        country_code: &str,
        region_code: &str,
        now: DateTime<Utc>,
    ) -> Option<&TimezoneRecord> {
        let id = self.timezone_id(country_code, region_code)?;
        let periods = self.periods.get(&id)?;
        let idx = periods.partition_point(|p| p.valid_from <= now);
        idx.checked_sub(1).map(|i| &periods[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn period(id: i64, start: i64, offset: i32, dst: bool) -> TimezoneRecord {
        TimezoneRecord {
            timezone_id: id,
            name: "America/Sao_Paulo".to_string(),
            gmt_offset: offset,
            is_dst: dst,
            abbreviation: if dst { "BRST" } else { "BRT" }.to_string(),
            valid_from: Utc.timestamp_opt(start, 0).unwrap(),
        }
    }

    fn index() -> TimezoneIndex {
        TimezoneIndex::new(
            vec![
                FipsRegion {
                    country_code: "BR".into(),
                    region_code: "27".into(),
                    timezone_id: 1,
                },
                FipsRegion {
                    country_code: "BR".into(),
                    region_code: "00".into(),
                    timezone_id: 1,
                },
            ],
            // 故意乱序
            vec![
                period(1, 2_000, -7200, true),
                period(1, 1_000, -10800, false),
                period(1, 3_000, -10800, false),
            ],
        )
    }

    #[test]
    fn test_selects_latest_period_not_after_now() {
        let idx = index();
        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();

        assert!(idx.lookup("BR", "27", at(999)).is_none());
        assert_eq!(idx.lookup("BR", "27", at(1_000)).unwrap().gmt_offset, -10800);
        assert_eq!(idx.lookup("BR", "27", at(2_500)).unwrap().gmt_offset, -7200);
        assert!(idx.lookup("BR", "27", at(2_500)).unwrap().is_dst);
        assert_eq!(idx.lookup("BR", "27", at(9_999)).unwrap().gmt_offset, -10800);
    }

    #[test]
    fn test_empty_region_defaults_to_00() {
        let idx = index();
        let now = Utc.timestamp_opt(2_500, 0).unwrap();
        assert!(idx.lookup("BR", "", now).is_some());
        assert_eq!(idx.timezone_id("BR", ""), Some(1));
    }

    #[test]
    fn test_unknown_region() {
        let idx = index();
        let now = Utc.timestamp_opt(2_500, 0).unwrap();
        assert!(idx.lookup("US", "CA", now).is_none());
        assert!(idx.lookup("BR", "99", now).is_none());
    }
}
