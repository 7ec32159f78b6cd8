//! CLI argument definitions using clap
//!
//! Commands:
//! - jsonstore serve [--config <path>] [--port <port>]
//! - jsonstore init [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// jsonstore - a minimal JSON document store over HTTP
#[derive(Parser, Debug)]
#[command(name = "jsonstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the store and serve the record API
    Serve {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to bind, overriding configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create the records table and exit
    Init {
        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
