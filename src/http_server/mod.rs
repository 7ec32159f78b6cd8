//! # HTTP Server Module
//!
//! Serves the record API over axum.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - everything else - record API, relative to the configured prefix

pub mod config;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::{build_router, HttpServer};
