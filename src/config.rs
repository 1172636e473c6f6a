//! Configuration
//!
//! TigerStyle: Static configuration, resolved once at startup. The binary
//! fills these from CLI flags and `SHIPS_*` environment variables.

use std::net::SocketAddr;
use std::path::Path;

use crate::api::auth::TokenAuth;
use crate::constants::{DATABASE_CONNECTIONS_COUNT_MAX, DATABASE_PATH_IN_MEMORY};

/// Which storage backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StorageKind {
    /// In-process, lost on exit
    Memory,
    /// SQLite database file
    #[default]
    Sqlite,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Database file, or `:memory:`
    pub database_path: String,
    pub max_connections: u32,
}

impl StorageConfig {
    /// In-memory backend.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            kind: StorageKind::Memory,
            database_path: DATABASE_PATH_IN_MEMORY.to_string(),
            max_connections: 1,
        }
    }

    /// SQLite backend on a private in-memory database.
    #[must_use]
    pub fn sqlite_in_memory() -> Self {
        Self {
            kind: StorageKind::Sqlite,
            database_path: DATABASE_PATH_IN_MEMORY.to_string(),
            max_connections: 1,
        }
    }

    /// SQLite backend on a database file.
    ///
    /// A leading `~` in the path is expanded to the home directory.
    pub fn sqlite(database_path: &str, max_connections: u32) -> Result<Self, ConfigError> {
        if max_connections == 0 || max_connections > DATABASE_CONNECTIONS_COUNT_MAX {
            return Err(ConfigError::MaxConnections {
                value: max_connections,
                max: DATABASE_CONNECTIONS_COUNT_MAX,
            });
        }
        if database_path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        let database_path = if database_path == DATABASE_PATH_IN_MEMORY {
            database_path.to_string()
        } else {
            shellexpand::tilde(database_path).to_string()
        };

        Ok(Self {
            kind: StorageKind::Sqlite,
            database_path,
            max_connections,
        })
    }

    /// Create the parent directory of a file database.
    pub fn ensure_parent_dir(&self) -> std::io::Result<()> {
        if self.kind != StorageKind::Sqlite || self.database_path == DATABASE_PATH_IN_MEMORY {
            return Ok(());
        }
        match Path::new(&self.database_path).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::memory()
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub storage: StorageConfig,
    pub auth: TokenAuth,
}

impl Config {
    /// Resolve raw settings into a config.
    ///
    /// `api_tokens` is a comma-separated list of `token:user_id` pairs.
    pub fn new(
        bind: &str,
        storage_kind: StorageKind,
        database_path: &str,
        max_connections: u32,
        api_tokens: &str,
    ) -> Result<Self, ConfigError> {
        let bind = bind
            .parse()
            .map_err(|_| ConfigError::BindAddress(bind.to_string()))?;

        let storage = match storage_kind {
            StorageKind::Memory => StorageConfig::memory(),
            StorageKind::Sqlite => StorageConfig::sqlite(database_path, max_connections)?,
        };

        let auth = TokenAuth::parse(api_tokens)?;

        Ok(Self {
            bind,
            storage,
            auth,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address: {0}")]
    BindAddress(String),

    #[error("database path cannot be empty")]
    EmptyDatabasePath,

    #[error("max connections {value} must be between 1 and {max}")]
    MaxConnections { value: u32, max: u32 },

    #[error("invalid api token entry {entry:?}: expected token:user_id")]
    ApiToken { entry: String },
}
