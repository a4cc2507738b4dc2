//! Dataset sources
//!
//! A source knows how to load a whole dataset snapshot from a path and how
//! to report the path's modification time. The production source reads the
//! SQLite file written by the offline importer.

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sea_orm::sqlx::{self, Row, SqlitePool};
use tracing::{debug, info};

use crate::errors::{GeoError, Result};
use crate::geo::{FipsRegion, GeoPayload, GeoRecord, RangeIndex, TimezoneIndex, TimezoneRecord};

#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Load and fully validate a snapshot.
    async fn load_all(&self, path: &Path) -> Result<RangeIndex>;

    /// Modification time of the dataset at `path`.
    async fn modified(&self, path: &Path) -> Result<SystemTime>;

    /// 获取 source 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// SQLite dataset (`ip_group_city`, `timezones`, `timezones_data`, `fips_regions`).
pub struct SqliteSource;

impl SqliteSource {
    async fn connect(path: &Path) -> Result<SqlitePool> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(GeoError::dataset_load_failed(format!(
                "dataset file not found: {}",
                path.display()
            )));
        }

        // 只读打开，导入工具可能正在替换文件
        let opt = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opt)
            .await?;
        Ok(pool)
    }

    async fn load_ranges(pool: &SqlitePool) -> Result<Vec<GeoRecord>> {
        let rows = sqlx::query("SELECT ip_start, data FROM ip_group_city")
            .fetch_all(pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let ip_start: i64 = row.try_get("ip_start")?;
            let data: String = row.try_get("data")?;

            let range_start = u32::try_from(ip_start).map_err(|_| {
                GeoError::dataset_load_failed(format!("ip_start {} out of range", ip_start))
            })?;
            let payload: GeoPayload = serde_json::from_str(&data).map_err(|e| {
                GeoError::dataset_load_failed(format!(
                    "invalid payload for ip_start {}: {}",
                    ip_start, e
                ))
            })?;

            records.push(GeoRecord::from_payload(range_start, payload));
        }
        Ok(records)
    }

    async fn load_timezones(pool: &SqlitePool) -> Result<TimezoneIndex> {
        let names: HashMap<i64, String> = sqlx::query("SELECT id, name FROM timezones")
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|row| -> std::result::Result<(i64, String), sqlx::Error> {
                Ok((row.try_get("id")?, row.try_get("name")?))
            })
            .collect::<std::result::Result<_, _>>()?;

        let rows = sqlx::query(
            "SELECT timezone, start, gmtoff, abbreviation, isdst FROM timezones_data",
        )
        .fetch_all(pool)
        .await?;

        let mut periods = Vec::with_capacity(rows.len());
        for row in rows {
            let timezone_id: i64 = row.try_get("timezone")?;
            let start: i64 = row.try_get("start")?;
            let gmtoff: i64 = row.try_get("gmtoff")?;
            let abbreviation: Option<String> = row.try_get("abbreviation")?;
            let isdst: i64 = row.try_get("isdst")?;

            let valid_from = Utc.timestamp_opt(start, 0).single().ok_or_else(|| {
                GeoError::dataset_load_failed(format!("invalid timezone start {}", start))
            })?;
            let gmt_offset = i32::try_from(gmtoff).map_err(|_| {
                GeoError::dataset_load_failed(format!("gmtoff {} out of range", gmtoff))
            })?;

            periods.push(TimezoneRecord {
                timezone_id,
                name: names.get(&timezone_id).cloned().unwrap_or_default(),
                gmt_offset,
                is_dst: isdst != 0,
                abbreviation: abbreviation.unwrap_or_default(),
                valid_from,
            });
        }

        let regions = sqlx::query("SELECT country_code, code, timezone FROM fips_regions")
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|row| -> std::result::Result<FipsRegion, sqlx::Error> {
                Ok(FipsRegion {
                    country_code: row.try_get("country_code")?,
                    region_code: row.try_get("code")?,
                    timezone_id: row.try_get("timezone")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(TimezoneIndex::new(regions, periods))
    }
}

#[async_trait]
impl DatasetSource for SqliteSource {
    async fn load_all(&self, path: &Path) -> Result<RangeIndex> {
        let started = std::time::Instant::now();
        let pool = Self::connect(path).await?;

        let loaded = async {
            let ranges = Self::load_ranges(&pool).await?;
            let timezones = Self::load_timezones(&pool).await?;
            Ok::<_, GeoError>((ranges, timezones))
        }
        .await;
        pool.close().await;

        let (ranges, timezones) = loaded?;
        debug!(
            "Read {} ranges from {} in {:?}",
            ranges.len(),
            path.display(),
            started.elapsed()
        );

        let index = RangeIndex::build(ranges, timezones)?;
        info!(
            "Dataset loaded from {}: {} ranges",
            path.display(),
            index.len()
        );
        Ok(index)
    }

    async fn modified(&self, path: &Path) -> Result<SystemTime> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(metadata.modified()?)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
