//! Observability for jsonstore
//!
//! Logging only: `tracing` events from every layer, a `TraceLayer` on the
//! router, and a `tracing-subscriber` formatter installed at startup.

mod logger;

pub use logger::init_logging;
