//! CLI command implementations
//!
//! Startup is: load config, open the store, create the schema, then either
//! serve or exit.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::config::{ServiceConfig, StorageConfig};
use crate::http_server::HttpServer;
use crate::observability::init_logging;
use crate::rest_api::{ApiState, ProductionGate, RecordService};
use crate::store::{RecordStore, RemoteStore, SqliteStore};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    init_logging();
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::Init { config } => init(config.as_deref()),
    }
}

/// Open the configured backend and make sure the table exists
pub async fn open_store(config: &StorageConfig) -> CliResult<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config {
        StorageConfig::Sqlite { path } => {
            info!(path = %path, "opening sqlite store");
            Arc::new(SqliteStore::open(path)?)
        }
        StorageConfig::Remote { url, auth_token } => {
            info!(url = %url, "using remote store");
            Arc::new(RemoteStore::new(url, auth_token.clone()))
        }
    };
    store.init_schema().await?;
    Ok(store)
}

/// Assemble API state: store-backed operations plus the production gate
pub fn api_state(config: &ServiceConfig, store: Arc<dyn RecordStore>) -> ApiState {
    let gate = ProductionGate::from_env(&config.production);
    if gate.is_production() {
        info!(
            header = %config.production.header,
            "production gate active for mutations"
        );
    }
    ApiState::new(
        RecordService::new(store),
        Arc::new(gate),
        config.server.path_prefix.clone(),
    )
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// Serve the record API until stopped
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = ServiceConfig::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
        config.validate()?;
    }

    runtime()?.block_on(async {
        let store = open_store(&config.storage).await?;
        let state = api_state(&config, store);
        HttpServer::new(config.server.clone(), state)
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Create the records table and exit
pub fn init(config_path: Option<&Path>) -> CliResult<()> {
    let config = ServiceConfig::load(config_path)?;
    runtime()?.block_on(open_store(&config.storage))?;
    write_json(&json!({"initialized": true}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_store_creates_sqlite_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/records.db");
        let config = StorageConfig::Sqlite {
            path: path.display().to_string(),
        };

        let store = open_store(&config).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_api_state_uses_configured_prefix() {
        let mut config = ServiceConfig::default();
        config.server.path_prefix = "/v1/docs".to_string();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let state = api_state(&config, store);
        assert_eq!(state.path_prefix, "/v1/docs");
    }
}
