//! HTTP boundary
//!
//! Routes, response renderers, CORS and the health endpoint.

pub mod cors;
pub mod render;
pub mod services;
