//! Lookup orchestration
//!
//! `QuotaCheck → AddressResolve → ReservedCheck → IndexLookup`. Each step
//! either advances or ends the request with exactly one error kind; nothing
//! is retried. Errors never touch shared state, so an abandoned request
//! leaves the dataset handle and the quota gate as they were.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use crate::errors::{GeoError, Result};
use crate::geo::{GeoRecord, TimezoneRecord, codec, is_reserved};
use crate::quota::{QuotaGate, QuotaUsage};
use crate::services::resolver::HostResolver;
use crate::storage::DatasetHandle;

/// A resolved address and the record that covers it.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    /// The literal that was looked up (the resolved address for hostnames).
    pub ip: String,
    pub record: GeoRecord,
}

/// A lookup result with the quota state of the request that produced it.
#[derive(Debug)]
pub struct Metered<T> {
    /// `None` when the quota store could not be reached.
    pub usage: Option<QuotaUsage>,
    pub result: Result<T>,
}

#[derive(Clone)]
pub struct LookupService {
    dataset: Arc<DatasetHandle>,
    quota: QuotaGate,
    resolver: Arc<dyn HostResolver>,
}

impl LookupService {
    pub fn new(
        dataset: Arc<DatasetHandle>,
        quota: QuotaGate,
        resolver: Arc<dyn HostResolver>,
    ) -> Self {
        Self {
            dataset,
            quota,
            resolver,
        }
    }

    pub fn dataset(&self) -> &Arc<DatasetHandle> {
        &self.dataset
    }

    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Geolocate `input` (address, hostname, or empty for the client itself).
    pub async fn lookup_address(&self, client: &str, input: &str) -> Result<Located> {
        self.lookup_address_metered(client, input).await.result
    }

    pub async fn lookup_address_metered(&self, client: &str, input: &str) -> Metered<Located> {
        let check = self.quota.evaluate(client).await;
        let result = match check.decision.into_result(client) {
            Ok(()) => self.locate(client, input).await,
            Err(e) => Err(e),
        };
        Metered {
            usage: check.usage,
            result,
        }
    }

    async fn locate(&self, client: &str, input: &str) -> Result<Located> {
        let (ip, key) = codec::resolve(input, client, self.resolver.as_ref()).await?;

        if is_reserved(key) {
            trace!("{} is reserved", ip);
            return Ok(Located {
                ip,
                record: GeoRecord::reserved(key),
            });
        }

        let index = self.dataset.get();
        match index.lookup(key) {
            Some(record) => Ok(Located {
                ip,
                record: record.clone(),
            }),
            None => {
                debug!("No range covers {}", ip);
                Err(GeoError::not_found(format!("no record for {}", ip)))
            }
        }
    }

    /// Current timezone period of a country/region pair.
    pub async fn lookup_timezone(
        &self,
        client: &str,
        country_code: &str,
        region_code: &str,
    ) -> Result<TimezoneRecord> {
        self.lookup_timezone_metered(client, country_code, region_code)
            .await
            .result
    }

    pub async fn lookup_timezone_metered(
        &self,
        client: &str,
        country_code: &str,
        region_code: &str,
    ) -> Metered<TimezoneRecord> {
        let check = self.quota.evaluate(client).await;
        let result = check.decision.into_result(client).and_then(|()| {
            let index = self.dataset.get();
            index
                .lookup_timezone(country_code, region_code, Utc::now())
                .cloned()
                .ok_or_else(|| {
                    GeoError::not_found(format!(
                        "no timezone for {}/{}",
                        country_code, region_code
                    ))
                })
        });
        Metered {
            usage: check.usage,
            result,
        }
    }
}
