//! Application lifecycle
//!
//! - `lifetime`: startup wiring and graceful shutdown
//! - `modes`: execution modes (currently the HTTP server)

pub mod lifetime;
pub mod modes;
