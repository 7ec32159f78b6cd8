//! CLI module for jsonstore
//!
//! Provides command-line interface for:
//! - serve: open the store and serve HTTP
//! - init: create the records table

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{api_state, init, open_store, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
