//! Service layer for business logic
//!
//! This module provides the lookup orchestration shared by the HTTP API,
//! plus the hostname resolver it depends on.

pub mod lookup;
pub mod resolver;

pub use lookup::{Located, LookupService, Metered};
pub use resolver::{HostResolver, SystemResolver};
