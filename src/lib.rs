//! jsonstore - a minimal JSON document store served over HTTP
//!
//! Clients store arbitrary JSON under server-generated ids and read, replace
//! or delete it later. Storage is an embedded SQLite file or a remote
//! libSQL database.

pub mod cli;
pub mod config;
pub mod http_server;
pub mod observability;
pub mod rest_api;
pub mod store;
