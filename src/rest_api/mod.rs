//! # Record REST API
//!
//! Maps HTTP requests onto the five record operations:
//!
//! - `GET /` - list summaries, most recently updated first
//! - `GET /{id}` - fetch one record
//! - `POST /` - create from `{"data": ...}`
//! - `PUT /{id}` - replace data
//! - `DELETE /{id}` - remove
//!
//! Paths are relative to the configured prefix. A [`MutationGuard`] runs
//! before dispatch.

pub mod errors;
pub mod guard;
pub mod handler;
pub mod route;
pub mod server;

pub use errors::{ApiError, ApiResult};
pub use guard::{MutationGuard, OpenGuard, ProductionGate};
pub use handler::RecordService;
pub use route::Operation;
pub use server::{records_router, ApiState};
