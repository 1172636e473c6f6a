//! Ships - Owned Ship Records with Pluggable Storage
//!
//! Authenticated users create, list, retrieve and soft-delete the ships they
//! own. A stateless logic layer forwards every call to a storage backend
//! chosen at startup.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  api (axum)          │ auth, pagination     │
//! ├─────────────────────────────────────────────┤
//! │  ShipLogic           │ create/get/update/   │
//! │                      │ delete               │
//! ├─────────────────────────────────────────────┤
//! │  ShipStorage trait   │ MemoryStorage        │
//! │                      │ SqliteStorage        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use ships::{MemoryStorage, NewShip, ShipLogic, ShipQuery};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let logic = ShipLogic::new(Arc::new(MemoryStorage::new()));
//! let ship = logic
//!     .create_ship(NewShip::new("GOODSHIP COTTON", "1234567", 1))
//!     .await
//!     .unwrap();
//!
//! let deleted = logic.delete_ship(ship.id).await.unwrap();
//! assert!(deleted.is_deleted());
//!
//! let (ships, count) = logic.get_ships(&ShipQuery::new().user_ids([1])).await.unwrap();
//! assert_eq!(count, 1);
//! assert_eq!(ships[0].id, ship.id);
//! # });
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod clock;
pub mod config;
pub mod constants;
pub mod logic;
pub mod ship;
pub mod storage;

// Re-export common types
pub use clock::{Clock, SimClock, SystemClock};
pub use config::{Config, StorageConfig, StorageKind};
pub use logic::ShipLogic;
pub use ship::{
    NewShip, OrderBy, Ship, ShipError, ShipField, ShipId, ShipQuery, ShipStatus, ShipUpdate, UserId,
};
pub use storage::{MemoryStorage, ShipStorage, StorageError, StorageResult};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStorage;
