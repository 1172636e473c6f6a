//! ShipStorage trait

use async_trait::async_trait;

use super::error::StorageResult;
use crate::ship::{NewShip, Ship, ShipId, ShipQuery, ShipUpdate};

/// Persistence for ship records.
///
/// Both backends must be observably identical: a test suite written
/// against this trait passes unchanged on either one.
#[async_trait]
pub trait ShipStorage: Send + Sync + std::fmt::Debug {
    /// Validate and insert a new ship, assigning its id and timestamps.
    ///
    /// # Errors
    /// `Duplicate` if (imo_number, user_id) is taken; nothing is written.
    async fn persist(&self, new: NewShip) -> StorageResult<Ship>;

    /// Ships matching every filter in `query`, ordered, with the match count.
    async fn retrieve(&self, query: &ShipQuery) -> StorageResult<(Vec<Ship>, usize)>;

    /// Apply a partial update and refresh `modified`.
    ///
    /// # Errors
    /// `NotFound` if no ship has `id`; on any error the ship is unchanged.
    async fn update(&self, id: ShipId, update: ShipUpdate) -> StorageResult<Ship>;

    /// Soft delete: set the status to `DELETED`.
    async fn delete(&self, id: ShipId) -> StorageResult<Ship> {
        self.update(id, ShipUpdate::deleted()).await
    }

    /// Remove every record. Test isolation only.
    async fn wipe(&self) -> StorageResult<()>;
}
