//! Storage - Backend Trait and Implementations
//!
//! TigerStyle: Abstract storage, backends interchangeable without touching
//! the logic layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ShipStorage Trait                         │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │  MemoryStorage  │           │  SqliteStorage  │
//! │   (in-process)  │           │  (relational)   │
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! The backend is picked once at startup from [`StorageConfig`]; nothing
//! switches it afterwards.

mod backend;
mod error;
mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

use std::sync::Arc;

pub use backend::ShipStorage;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStorage;

use crate::clock::Clock;
use crate::config::{StorageConfig, StorageKind};

/// Open the backend named by `config`.
///
/// # Errors
/// Returns error if the relational backend cannot be opened, or if it was
/// requested from a build without the `sqlite` feature.
pub async fn open(config: &StorageConfig, clock: Arc<dyn Clock>) -> StorageResult<Arc<dyn ShipStorage>> {
    match config.kind {
        StorageKind::Memory => {
            tracing::info!("using in-memory ship storage");
            Ok(Arc::new(MemoryStorage::with_clock(clock)))
        }
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => {
            tracing::info!(path = %config.database_path, "using sqlite ship storage");
            let storage =
                SqliteStorage::open_with_clock(&config.database_path, config.max_connections, clock)
                    .await?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = clock;
            Err(StorageError::connection(
                "sqlite storage requested but the `sqlite` feature is disabled",
            ))
        }
    }
}
