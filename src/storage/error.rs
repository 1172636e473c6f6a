//! Storage errors

use crate::ship::{ShipError, ShipId, UserId};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from storage operations.
///
/// `Duplicate` and `NotFound` are the two failures callers are expected to
/// handle. Everything else is an opaque backend failure; storage never
/// retries.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The (imo_number, user_id) pair is already taken
    #[error("duplicate ship: imo_number {imo_number} already registered for user {user_id}")]
    Duplicate { imo_number: String, user_id: UserId },

    /// No ship has this id
    #[error("ship not found: {id}")]
    NotFound { id: ShipId },

    /// Rejected values, field names or status changes
    #[error(transparent)]
    Invalid(#[from] ShipError),

    /// Backend unreachable
    #[error("connection failed: {reason}")]
    Connection { reason: String },

    /// Read failed
    #[error("read failed: {reason}")]
    Read { reason: String },

    /// Write failed
    #[error("write failed: {reason}")]
    Write { reason: String },

    /// Internal error
    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl StorageError {
    pub fn duplicate(imo_number: impl Into<String>, user_id: UserId) -> Self {
        Self::Duplicate {
            imo_number: imo_number.into(),
            user_id,
        }
    }

    pub fn not_found(id: ShipId) -> Self {
        Self::NotFound { id }
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    pub fn read(reason: impl Into<String>) -> Self {
        Self::Read {
            reason: reason.into(),
        }
    }

    pub fn write(reason: impl Into<String>) -> Self {
        Self::Write {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Check if this error is a uniqueness conflict.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Check if this error indicates the ship does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
