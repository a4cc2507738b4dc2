//! Geolocation core
//!
//! - `codec`: IPv4 text ⇄ 32-bit key, hostname fallback
//! - `reserved`: static reserved-block predicate
//! - `index`: range-start index over one dataset snapshot
//! - `timezone`: FIPS region → timezone period tables

pub mod codec;
pub mod index;
pub mod record;
pub mod reserved;
pub mod timezone;

pub use index::RangeIndex;
pub use record::{FipsRegion, GeoPayload, GeoRecord, TimezoneRecord};
pub use reserved::is_reserved;
pub use timezone::TimezoneIndex;
