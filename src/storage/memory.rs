//! MemoryStorage - In-Process Backend
//!
//! TigerStyle: Same contract as the SQLite backend, no external
//! dependencies. One write lock covers every check-and-mutate so the
//! uniqueness invariant cannot race.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::ShipStorage;
use super::error::{StorageError, StorageResult};
use crate::clock::{Clock, SystemClock};
use crate::ship::{NewShip, Ship, ShipId, ShipQuery, ShipUpdate, UserId};

#[derive(Debug)]
struct MemoryState {
    /// Ships by id
    ships: BTreeMap<ShipId, Ship>,
    /// Taken (imo_number, user_id) pairs
    keys: HashSet<(String, UserId)>,
    /// Next id to hand out; never rewinds, not even on wipe
    next_id: ShipId,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            ships: BTreeMap::new(),
            keys: HashSet::new(),
            next_id: 1,
        }
    }
}

/// In-memory ship storage.
#[derive(Debug)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryStorage {
    /// Create an empty store using wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store with an injected clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            clock,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShipStorage for MemoryStorage {
    async fn persist(&self, new: NewShip) -> StorageResult<Ship> {
        new.validate()?;

        let mut state = self.state.write().await;

        let key = (new.imo_number.clone(), new.user_id);
        if state.keys.contains(&key) {
            tracing::warn!(
                imo_number = %new.imo_number,
                user_id = new.user_id,
                "duplicate ship rejected"
            );
            return Err(StorageError::duplicate(key.0, key.1));
        }

        let id = state.next_id;
        state.next_id += 1;

        let ship = Ship::from_new(id, new, self.clock.now());
        state.keys.insert(key);
        state.ships.insert(id, ship.clone());

        // Postcondition
        assert_eq!(state.keys.len(), state.ships.len(), "key index out of sync");

        tracing::debug!(ship_id = id, "persisted ship");
        Ok(ship)
    }

    async fn retrieve(&self, query: &ShipQuery) -> StorageResult<(Vec<Ship>, usize)> {
        let state = self.state.read().await;

        let mut ships: Vec<Ship> = state
            .ships
            .values()
            .filter(|ship| query.matches(ship))
            .cloned()
            .collect();
        query.sort(&mut ships);

        let total_count = ships.len();
        Ok((ships, total_count))
    }

    async fn update(&self, id: ShipId, update: ShipUpdate) -> StorageResult<Ship> {
        let mut state = self.state.write().await;

        let current = state.ships.get(&id).ok_or_else(|| StorageError::not_found(id))?;

        let mut next = current.clone();
        next.apply(update, self.clock.now())?;

        let old_key = (current.imo_number.clone(), current.user_id);
        let new_key = (next.imo_number.clone(), next.user_id);
        if new_key != old_key {
            if state.keys.contains(&new_key) {
                return Err(StorageError::duplicate(new_key.0, new_key.1));
            }
            state.keys.remove(&old_key);
            state.keys.insert(new_key);
        }

        state.ships.insert(id, next.clone());

        tracing::debug!(ship_id = id, status = %next.status, "updated ship");
        Ok(next)
    }

    async fn wipe(&self) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state.ships.clear();
        state.keys.clear();
        Ok(())
    }
}
