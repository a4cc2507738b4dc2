//! geoipd - IP geolocation and timezone lookup service
//!
//! Resolves IPv4 addresses (or hostnames) to location records from a
//! hot-reloadable SQLite dataset, with a per-client request quota backed by
//! Redis or an in-process counter store.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **metrics**: Prometheus metrics export
//!
//! # Architecture
//! - `geo`: address codec, reserved blocks, range index, timezone tables
//! - `storage`: dataset source and the hot-swappable dataset handle
//! - `quota`: counter stores and the per-minute quota gate
//! - `services`: lookup orchestration and hostname resolution
//! - `api`: HTTP routes and response renderers
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

#[macro_use]
mod metrics_macros;

pub mod api;
pub mod config;
pub mod errors;
pub mod geo;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod quota;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
