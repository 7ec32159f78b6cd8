//! Service configuration
//!
//! Loaded from an optional JSON file, then overlaid with environment
//! variables:
//!
//! - `JSONSTORE_HOST`, `JSONSTORE_PORT` - bind address
//! - `DATABASE_PATH` - use the SQLite backend at this path
//! - `DATABASE_URL`, `DATABASE_AUTH_TOKEN` - use the remote backend
//!
//! `DATABASE_URL` wins when both backends are named.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub production: ProductionConfig,
}

/// Which database backs the record table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Embedded SQLite file
    Sqlite {
        #[serde(default = "default_sqlite_path")]
        path: String,
    },
    /// Remote libSQL database
    Remote {
        url: String,
        #[serde(default)]
        auth_token: Option<String>,
    },
}

fn default_sqlite_path() -> String {
    "./jsonstore.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

/// Production gate settings
///
/// The gate is active when `env_var` equals `env_value` and the request
/// header `header` equals `header_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionConfig {
    #[serde(default = "default_env_var")]
    pub env_var: String,

    #[serde(default = "default_env_value")]
    pub env_value: String,

    #[serde(default = "default_header")]
    pub header: String,

    #[serde(default = "default_header_value")]
    pub header_value: String,
}

fn default_env_var() -> String {
    "APP_ENV".to_string()
}
fn default_env_value() -> String {
    "production".to_string()
}
fn default_header() -> String {
    "x-client".to_string()
}
fn default_header_value() -> String {
    "web".to_string()
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            env_value: default_env_value(),
            header: default_header(),
            header_value: default_header_value(),
        }
    }
}

impl ServiceConfig {
    /// Load from `path` if given, overlay the process environment, validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlay environment values; `lookup` is the environment
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("JSONSTORE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("JSONSTORE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::invalid("JSONSTORE_PORT", format!("'{}'", port)))?;
        }

        if let Some(url) = lookup("DATABASE_URL") {
            self.storage = StorageConfig::Remote {
                url,
                auth_token: lookup("DATABASE_AUTH_TOKEN"),
            };
        } else if let Some(path) = lookup("DATABASE_PATH") {
            self.storage = StorageConfig::Sqlite { path };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "must be > 0"));
        }
        if !self.server.path_prefix.starts_with('/') {
            return Err(ConfigError::invalid(
                "server.path_prefix",
                "must start with '/'",
            ));
        }
        match &self.storage {
            StorageConfig::Sqlite { path } if path.trim().is_empty() => {
                Err(ConfigError::invalid("storage.path", "must not be empty"))
            }
            StorageConfig::Remote { url, .. } if url.trim().is_empty() => {
                Err(ConfigError::invalid("storage.url", "must not be empty"))
            }
            _ => Ok(()),
        }
    }
}
