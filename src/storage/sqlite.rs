//! SqliteStorage - Relational Backend
//!
//! TigerStyle: Real database storage, uniqueness enforced by the schema.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SqliteStorage                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pool: sqlx::SqlitePool (connection pooling)                 │
//! │  Table: ships (id, name, imo_number, user_id, status, ...)   │
//! │  Unique: (imo_number, user_id)                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS ships (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     name TEXT NOT NULL,
//!     imo_number TEXT NOT NULL,
//!     user_id INTEGER NOT NULL CHECK (user_id >= 0),
//!     status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'DELETED')),
//!     notes TEXT,
//!     created TEXT NOT NULL,
//!     modified TEXT NOT NULL,
//!     UNIQUE (imo_number, user_id)
//! );
//! CREATE INDEX IF NOT EXISTS idx_ships_user_id ON ships(user_id);
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 text with microseconds so
//! that ordering by the column matches ordering by time.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::backend::ShipStorage;
use super::error::{StorageError, StorageResult};
use crate::clock::{Clock, SystemClock};
use crate::constants::{
    DATABASE_BUSY_TIMEOUT_MS, DATABASE_CONNECTIONS_COUNT_MAX, DATABASE_PATH_IN_MEMORY,
};
use crate::ship::{NewShip, OrderBy, Ship, ShipField, ShipId, ShipQuery, ShipStatus, ShipUpdate};

/// Column list in record order.
const SHIP_COLUMNS: &str = "id, name, imo_number, user_id, status, notes, created, modified";

/// Timestamp text format: fixed width so text order is time order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

// =============================================================================
// SqliteStorage
// =============================================================================

/// SQLite storage backend.
///
/// TigerStyle: Connection pooling, explicit schema, proper error handling.
#[derive(Debug)]
pub struct SqliteStorage {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStorage {
    /// Open (creating if missing) the database at `path`.
    ///
    /// `":memory:"` opens a private in-memory database. The pool is then
    /// pinned to a single connection that never expires, since every
    /// connection to `:memory:` sees its own empty database.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or the schema cannot
    /// be created.
    pub async fn open(path: &str, max_connections: u32) -> StorageResult<Self> {
        Self::open_with_clock(path, max_connections, Arc::new(SystemClock)).await
    }

    /// Same as [`SqliteStorage::open`] with an injected clock.
    pub async fn open_with_clock(
        path: &str,
        max_connections: u32,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        // Preconditions
        assert!(!path.is_empty(), "database path cannot be empty");
        assert!(max_connections > 0, "pool needs at least one connection");
        assert!(
            max_connections <= DATABASE_CONNECTIONS_COUNT_MAX,
            "max_connections {} exceeds max {}",
            max_connections,
            DATABASE_CONNECTIONS_COUNT_MAX
        );

        let pool = if path == DATABASE_PATH_IN_MEMORY {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StorageError::connection(format!("invalid database path: {e}")))?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await
        } else {
            let options = SqliteConnectOptions::new()
                .filename(Path::new(path))
                .create_if_missing(true)
                .busy_timeout(Duration::from_millis(DATABASE_BUSY_TIMEOUT_MS));
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await
        }
        .map_err(|e| StorageError::connection(format!("failed to open {path}: {e}")))?;

        Self::from_pool(pool, clock).await
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let storage = Self { pool, clock };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize database schema.
    async fn init_schema(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                imo_number TEXT NOT NULL,
                user_id INTEGER NOT NULL CHECK (user_id >= 0),
                status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'DELETED')),
                notes TEXT,
                created TEXT NOT NULL,
                modified TEXT NOT NULL,
                UNIQUE (imo_number, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::internal(format!("failed to create schema: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ships_user_id ON ships(user_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::internal(format!("failed to create index: {e}")))?;

        Ok(())
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(text: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StorageError::internal(format!("invalid timestamp {text:?}: {e}")))
}

/// Parse a database row into a Ship.
fn row_to_ship(row: &SqliteRow) -> StorageResult<Ship> {
    let get_err = |e: sqlx::Error| StorageError::internal(e.to_string());

    let status: String = row.try_get("status").map_err(get_err)?;
    let created: String = row.try_get("created").map_err(get_err)?;
    let modified: String = row.try_get("modified").map_err(get_err)?;

    Ok(Ship {
        id: row.try_get("id").map_err(get_err)?,
        name: row.try_get("name").map_err(get_err)?,
        imo_number: row.try_get("imo_number").map_err(get_err)?,
        user_id: row.try_get("user_id").map_err(get_err)?,
        status: ShipStatus::from_str(&status)?,
        notes: row.try_get("notes").map_err(get_err)?,
        created: parse_timestamp(&created)?,
        modified: parse_timestamp(&modified)?,
    })
}

/// Translate a write error, recognising the uniqueness constraint.
fn write_error(err: sqlx::Error, imo_number: &str, user_id: u32, context: &str) -> StorageError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::duplicate(imo_number, user_id)
        }
        _ => StorageError::write(format!("{context}: {err}")),
    }
}

fn push_order_by(builder: &mut QueryBuilder<'_, Sqlite>, order: OrderBy) {
    let direction = if order.descending { "DESC" } else { "ASC" };
    // Column names come from a closed enum, never from caller text.
    builder.push(format!(
        " ORDER BY {} {direction}, id {direction}",
        order.field.as_str()
    ));
}

// =============================================================================
// ShipStorage Implementation
// =============================================================================

#[async_trait]
impl ShipStorage for SqliteStorage {
    async fn persist(&self, new: NewShip) -> StorageResult<Ship> {
        new.validate()?;

        let now = self.clock.now();
        let stamp = format_timestamp(now);

        let result = sqlx::query(
            r#"
            INSERT INTO ships (name, imo_number, user_id, status, notes, created, modified)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.imo_number)
        .bind(new.user_id)
        .bind(new.status.as_str())
        .bind(&new.notes)
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = write_error(e, &new.imo_number, new.user_id, "failed to persist ship");
            if err.is_duplicate() {
                tracing::warn!(
                    imo_number = %new.imo_number,
                    user_id = new.user_id,
                    "duplicate ship rejected"
                );
            } else {
                tracing::error!(error = %err, "failed to persist ship");
            }
            err
        })?;

        let id = result.last_insert_rowid();

        // Postcondition
        assert!(id > 0, "sqlite row ids are positive");

        tracing::debug!(ship_id = id, "persisted ship");
        Ok(Ship::from_new(id, new, now))
    }

    async fn retrieve(&self, query: &ShipQuery) -> StorageResult<(Vec<Ship>, usize)> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {SHIP_COLUMNS} FROM ships WHERE 1 = 1"));

        if let Some(id) = query.id {
            builder.push(" AND id = ").push_bind(id);
        }
        if !query.ids.is_empty() {
            builder.push(" AND id IN (");
            let mut separated = builder.separated(", ");
            for id in &query.ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
        }
        if !query.user_ids.is_empty() {
            builder.push(" AND user_id IN (");
            let mut separated = builder.separated(", ");
            for user_id in &query.user_ids {
                separated.push_bind(*user_id);
            }
            separated.push_unseparated(")");
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        push_order_by(
            &mut builder,
            query.order_by.unwrap_or(OrderBy::asc(ShipField::Id)),
        );

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::read(format!("failed to retrieve ships: {e}")))?;

        let mut ships = Vec::with_capacity(rows.len());
        for row in &rows {
            ships.push(row_to_ship(row)?);
        }

        let total_count = ships.len();
        Ok((ships, total_count))
    }

    async fn update(&self, id: ShipId, update: ShipUpdate) -> StorageResult<Ship> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::connection(format!("failed to begin transaction: {e}")))?;

        // Write lock first: a read lock cannot be upgraded while another
        // writer waits, and competing updates must queue on the busy timeout.
        let locked = sqlx::query("UPDATE ships SET modified = modified WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::write(format!("failed to lock ship: {e}")))?;
        if locked.rows_affected() == 0 {
            return Err(StorageError::not_found(id));
        }

        let row = sqlx::query(&format!("SELECT {SHIP_COLUMNS} FROM ships WHERE id = ?"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StorageError::read(format!("failed to load ship: {e}")))?;

        let mut ship = row_to_ship(&row)?;
        ship.apply(update, self.clock.now())?;

        sqlx::query(
            r#"
            UPDATE ships
            SET name = ?, imo_number = ?, status = ?, notes = ?, modified = ?
            WHERE id = ?
            "#,
        )
        .bind(&ship.name)
        .bind(&ship.imo_number)
        .bind(ship.status.as_str())
        .bind(&ship.notes)
        .bind(format_timestamp(ship.modified))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, &ship.imo_number, ship.user_id, "failed to update ship"))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::write(format!("failed to commit update: {e}")))?;

        tracing::debug!(ship_id = id, status = %ship.status, "updated ship");
        Ok(ship)
    }

    async fn wipe(&self) -> StorageResult<()> {
        sqlx::query("DELETE FROM ships")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::write(format!("failed to wipe ships: {e}")))?;

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
