//! Range-start index
//!
//! An immutable, sorted table of range starts. A point query resolves to the
//! record whose range start is the greatest value `<=` the queried address.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::record::{GeoRecord, TimezoneRecord};
use super::timezone::TimezoneIndex;
use crate::errors::{GeoError, Result};

/// One published dataset snapshot. Read-only after [`RangeIndex::build`].
#[derive(Debug)]
pub struct RangeIndex {
    starts: Vec<u32>,
    records: Vec<GeoRecord>,
    timezones: TimezoneIndex,
    loaded_at: DateTime<Utc>,
}

impl RangeIndex {
    /// Build an index from unordered rows.
    ///
    /// Fails when the table is empty, when two rows share a range start, or
    /// when a row has no country code.
    pub fn build(mut rows: Vec<GeoRecord>, timezones: TimezoneIndex) -> Result<Self> {
        if rows.is_empty() {
            return Err(GeoError::dataset_load_failed("dataset has no ip ranges"));
        }

        rows.sort_unstable_by_key(|r| r.range_start);

        if let Some(pair) = rows
            .windows(2)
            .find(|w| w[0].range_start >= w[1].range_start)
        {
            return Err(GeoError::dataset_load_failed(format!(
                "duplicate range start {}",
                pair[1].range_start
            )));
        }

        if let Some(row) = rows.iter().find(|r| r.country_code.is_empty()) {
            return Err(GeoError::dataset_load_failed(format!(
                "range start {} has no country code",
                row.range_start
            )));
        }

        let starts = rows.iter().map(|r| r.range_start).collect();
        debug!(
            "Built range index with {} ranges and {} timezone regions",
            rows.len(),
            timezones.region_count()
        );

        Ok(Self {
            starts,
            records: rows,
            timezones,
            loaded_at: Utc::now(),
        })
    }

    /// Greatest range start `<=` key.
    ///
    /// `None` only when `key` lies below the first range start, which cannot
    /// happen for a table that starts at 0.
    pub fn lookup(&self, key: u32) -> Option<&GeoRecord> {
        let idx = self.starts.partition_point(|&start| start <= key);
        idx.checked_sub(1).map(|i| &self.records[i])
    }

    pub fn lookup_timezone(
        &self,
        country_code: &str,
        region_code: &str,
        now: DateTime<Utc>,
    ) -> Option<&TimezoneRecord> {
        self.timezones.lookup(country_code, region_code, now)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
