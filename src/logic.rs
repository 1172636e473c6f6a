//! Ship Logic
//!
//! TigerStyle: Thin façade over a storage backend. The logic layer holds no
//! state of its own; swapping the backend never touches this file.

use std::sync::Arc;

use tracing::instrument;

use crate::ship::{NewShip, Ship, ShipId, ShipQuery, ShipUpdate};
use crate::storage::{ShipStorage, StorageResult};

/// The four ship operations, delegated to a [`ShipStorage`].
#[derive(Debug, Clone)]
pub struct ShipLogic {
    storage: Arc<dyn ShipStorage>,
}

impl ShipLogic {
    pub fn new(storage: Arc<dyn ShipStorage>) -> Self {
        Self { storage }
    }

    /// The backend this logic writes to.
    pub fn storage(&self) -> &Arc<dyn ShipStorage> {
        &self.storage
    }

    /// Create a ship, `ACTIVE` unless the caller says otherwise.
    ///
    /// # Errors
    /// `StorageError::Duplicate` if the user already has a ship with this
    /// IMO number, deleted or not.
    #[instrument(skip(self, new), fields(imo_number = %new.imo_number, user_id = new.user_id), level = "info")]
    pub async fn create_ship(&self, new: NewShip) -> StorageResult<Ship> {
        let ship = self.storage.persist(new).await?;
        tracing::info!(ship_id = ship.id, "created ship");
        Ok(ship)
    }

    /// Ships matching `query` and the number of matches.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_ships(&self, query: &ShipQuery) -> StorageResult<(Vec<Ship>, usize)> {
        self.storage.retrieve(query).await
    }

    /// Partially update a ship. A `user_id` in the update is ignored.
    ///
    /// # Errors
    /// `StorageError::NotFound` if no ship has `id`.
    #[instrument(skip(self, update), level = "info")]
    pub async fn update_ship(&self, id: ShipId, update: ShipUpdate) -> StorageResult<Ship> {
        self.storage.update(id, update).await
    }

    /// Soft delete a ship.
    ///
    /// # Errors
    /// `StorageError::NotFound` if no ship has `id`.
    #[instrument(skip(self), level = "info")]
    pub async fn delete_ship(&self, id: ShipId) -> StorageResult<Ship> {
        let ship = self.storage.delete(id).await?;
        tracing::info!(ship_id = ship.id, "deleted ship");
        Ok(ship)
    }
}
