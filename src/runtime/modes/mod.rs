//! Mode routing
//!
//! The HTTP server is the only execution mode; `generate-config` is handled
//! directly in `main`.

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "server")]
pub use server::run_server;
