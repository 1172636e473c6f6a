//! Ship - The Owned Record
//!
//! TigerStyle: Explicit types, validation, closed status enum.
//!
//! A ship is a flat record keyed by a storage-assigned `id`. The pair
//! (`imo_number`, `user_id`) is unique across every record, deleted ones
//! included. Deletion is a status change, never a removal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{IMO_NUMBER_DIGITS_COUNT, SHIP_NAME_CHARS_MAX};

/// Storage-assigned ship identifier.
pub type ShipId = i64;

/// Identifier of the owning principal.
pub type UserId = u32;

// =============================================================================
// Ship Status
// =============================================================================

/// Lifecycle status of a ship.
///
/// `Deleted` is terminal: once set it can never go back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShipStatus {
    /// Live record
    #[default]
    Active,
    /// Soft-deleted record
    Deleted,
}

impl ShipStatus {
    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Deleted => "DELETED",
        }
    }

    /// Whether a record in this status may move to `next`.
    #[must_use]
    pub fn can_become(self, next: ShipStatus) -> bool {
        !matches!((self, next), (Self::Deleted, Self::Active))
    }
}

impl FromStr for ShipStatus {
    type Err = ShipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(ShipError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Fields and Ordering
// =============================================================================

/// Every column of a ship record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipField {
    Id,
    Name,
    ImoNumber,
    UserId,
    Status,
    Notes,
    Created,
    Modified,
}

impl ShipField {
    /// Column name, identical to the serialized key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::ImoNumber => "imo_number",
            Self::UserId => "user_id",
            Self::Status => "status",
            Self::Notes => "notes",
            Self::Created => "created",
            Self::Modified => "modified",
        }
    }

    /// All fields in record order.
    #[must_use]
    pub fn all() -> &'static [ShipField] {
        &[
            Self::Id,
            Self::Name,
            Self::ImoNumber,
            Self::UserId,
            Self::Status,
            Self::Notes,
            Self::Created,
            Self::Modified,
        ]
    }
}

impl FromStr for ShipField {
    type Err = ShipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ShipError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for ShipField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort key for retrieval: a field, ascending unless written with a
/// leading `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: ShipField,
    pub descending: bool,
}

impl OrderBy {
    #[must_use]
    pub fn asc(field: ShipField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    #[must_use]
    pub fn desc(field: ShipField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

impl FromStr for OrderBy {
    type Err = ShipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('-') {
            Some(field) => Ok(Self::desc(field.parse()?)),
            None => Ok(Self::asc(s.parse()?)),
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            write!(f, "{}", self.field)
        }
    }
}

// =============================================================================
// Ship
// =============================================================================

/// A persisted ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub imo_number: String,
    pub user_id: UserId,
    pub status: ShipStatus,
    pub notes: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Ship {
    /// Build the stored form of a new ship once storage has assigned an id.
    #[must_use]
    pub fn from_new(id: ShipId, new: NewShip, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            imo_number: new.imo_number,
            user_id: new.user_id,
            status: new.status,
            notes: new.notes,
            created: now,
            modified: now,
        }
    }

    /// Check if the ship has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.status == ShipStatus::Deleted
    }

    /// Apply a partial update in place and refresh `modified`.
    ///
    /// The ship is left untouched when the update is rejected. `user_id`
    /// in the update is ignored.
    pub fn apply(&mut self, update: ShipUpdate, now: DateTime<Utc>) -> Result<(), ShipError> {
        update.validate()?;

        if let Some(next) = update.status {
            if !self.status.can_become(next) {
                return Err(ShipError::InvalidTransition {
                    id: self.id,
                    from: self.status,
                    to: next,
                });
            }
        }

        if update.user_id.is_some() {
            tracing::debug!(ship_id = self.id, "cannot change the owner of a ship, ignoring user_id");
        }

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(imo_number) = update.imo_number {
            self.imo_number = imo_number;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        self.modified = now;

        Ok(())
    }

    /// Compare two ships on a single field.
    #[must_use]
    pub fn cmp_by(&self, other: &Ship, field: ShipField) -> std::cmp::Ordering {
        match field {
            ShipField::Id => self.id.cmp(&other.id),
            ShipField::Name => self.name.cmp(&other.name),
            ShipField::ImoNumber => self.imo_number.cmp(&other.imo_number),
            ShipField::UserId => self.user_id.cmp(&other.user_id),
            ShipField::Status => self.status.as_str().cmp(other.status.as_str()),
            ShipField::Notes => self.notes.cmp(&other.notes),
            ShipField::Created => self.created.cmp(&other.created),
            ShipField::Modified => self.modified.cmp(&other.modified),
        }
    }
}

impl fmt::Display for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.name, self.imo_number)
    }
}

// =============================================================================
// New Ship
// =============================================================================

/// Values for a ship that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShip {
    pub name: String,
    pub imo_number: String,
    pub user_id: UserId,
    #[serde(default)]
    pub status: ShipStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewShip {
    /// Create an active ship without notes.
    #[must_use]
    pub fn new(name: impl Into<String>, imo_number: impl Into<String>, user_id: UserId) -> Self {
        Self {
            name: name.into(),
            imo_number: imo_number.into(),
            user_id,
            status: ShipStatus::Active,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: ShipStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check every value against the record limits.
    ///
    /// A ship cannot be born deleted; deletion only happens through
    /// `delete`.
    pub fn validate(&self) -> Result<(), ShipError> {
        validate_name(&self.name)?;
        validate_imo_number(&self.imo_number)?;
        if self.status == ShipStatus::Deleted {
            return Err(ShipError::invalid(
                ShipField::Status,
                "new ships must be ACTIVE",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Ship Update
// =============================================================================

/// A typed partial update.
///
/// Only the fields listed here can be named in an update; deserializing an
/// update with any other key fails. `user_id` is accepted so that callers
/// echoing a whole record do not fail, but it never takes effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub imo_number: Option<String>,
    #[serde(default)]
    pub status: Option<ShipStatus>,
    /// `Some(None)` clears the notes.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl ShipUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn imo_number(mut self, imo_number: impl Into<String>) -> Self {
        self.imo_number = Some(imo_number.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: ShipStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(Some(notes.into()));
        self
    }

    #[must_use]
    pub fn clear_notes(mut self) -> Self {
        self.notes = Some(None);
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Status-only update used by soft delete.
    #[must_use]
    pub fn deleted() -> Self {
        Self::new().status(ShipStatus::Deleted)
    }

    /// Check the values that would be written.
    pub fn validate(&self) -> Result<(), ShipError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(imo_number) = &self.imo_number {
            validate_imo_number(imo_number)?;
        }
        Ok(())
    }
}

/// Distinguish an explicit `null` from an absent key.
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// =============================================================================
// Query
// =============================================================================

/// Filters and ordering for retrieval.
///
/// Every filter that is set narrows the result; an empty list or `None`
/// does not filter at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipQuery {
    pub id: Option<ShipId>,
    pub ids: Vec<ShipId>,
    pub user_ids: Vec<UserId>,
    pub status: Option<ShipStatus>,
    pub order_by: Option<OrderBy>,
}

impl ShipQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(mut self, id: ShipId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn ids(mut self, ids: impl IntoIterator<Item = ShipId>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn user_ids(mut self, user_ids: impl IntoIterator<Item = UserId>) -> Self {
        self.user_ids = user_ids.into_iter().collect();
        self
    }

    #[must_use]
    pub fn status(mut self, status: ShipStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Whether a ship passes every filter.
    #[must_use]
    pub fn matches(&self, ship: &Ship) -> bool {
        self.id.map_or(true, |id| ship.id == id)
            && (self.ids.is_empty() || self.ids.contains(&ship.id))
            && (self.user_ids.is_empty() || self.user_ids.contains(&ship.user_id))
            && self.status.map_or(true, |status| ship.status == status)
    }

    /// Sort ships in place: by the requested field with ties broken by
    /// `id` in the same direction, or by ascending `id` when unordered.
    pub fn sort(&self, ships: &mut [Ship]) {
        let order = self.order_by.unwrap_or(OrderBy::asc(ShipField::Id));
        ships.sort_by(|a, b| {
            let ordering = a
                .cmp_by(b, order.field)
                .then_with(|| a.id.cmp(&b.id));
            if order.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> Result<(), ShipError> {
    if name.trim().is_empty() {
        return Err(ShipError::invalid(ShipField::Name, "cannot be empty"));
    }
    let chars = name.chars().count();
    if chars > SHIP_NAME_CHARS_MAX {
        return Err(ShipError::invalid(
            ShipField::Name,
            format!("{chars} characters exceeds max {SHIP_NAME_CHARS_MAX}"),
        ));
    }
    Ok(())
}

fn validate_imo_number(imo_number: &str) -> Result<(), ShipError> {
    if imo_number.len() != IMO_NUMBER_DIGITS_COUNT
        || !imo_number.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ShipError::invalid(
            ShipField::ImoNumber,
            format!("must be exactly {IMO_NUMBER_DIGITS_COUNT} digits"),
        ));
    }
    Ok(())
}

// =============================================================================
// Errors
// =============================================================================

/// Errors about ship values, field names and status changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShipError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: ShipField, reason: String },

    #[error("unknown ship field: {0}")]
    UnknownField(String),

    #[error("unknown ship status: {0}")]
    UnknownStatus(String),

    #[error("ship {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: ShipId,
        from: ShipStatus,
        to: ShipStatus,
    },
}

impl ShipError {
    pub(crate) fn invalid(field: ShipField, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_ship(id: ShipId, name: &str) -> Ship {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Ship::from_new(id, NewShip::new(name, "1234567", 1), at)
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("ACTIVE".parse::<ShipStatus>(), Ok(ShipStatus::Active));
        assert_eq!("deleted".parse::<ShipStatus>(), Ok(ShipStatus::Deleted));
        assert!(matches!(
            "SUNK".parse::<ShipStatus>(),
            Err(ShipError::UnknownStatus(_))
        ));
        assert_eq!(ShipStatus::Deleted.to_string(), "DELETED");
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&ShipStatus::Active).unwrap();
        assert_eq!(json, "\"ACTIVE\"");
    }

    #[test]
    fn test_order_by_parse() {
        assert_eq!(
            "-created".parse::<OrderBy>(),
            Ok(OrderBy::desc(ShipField::Created))
        );
        assert_eq!("name".parse::<OrderBy>(), Ok(OrderBy::asc(ShipField::Name)));
        assert_eq!(
            "-tonnage".parse::<OrderBy>(),
            Err(ShipError::UnknownField("tonnage".to_string()))
        );
        assert_eq!(OrderBy::desc(ShipField::ImoNumber).to_string(), "-imo_number");
    }

    #[test]
    fn test_new_ship_validation() {
        assert!(NewShip::new("GOODSHIP COTTON", "1234567", 1).validate().is_ok());
        assert!(NewShip::new("", "1234567", 1).validate().is_err());
        assert!(NewShip::new("x".repeat(SHIP_NAME_CHARS_MAX + 1), "1234567", 1)
            .validate()
            .is_err());
        assert!(NewShip::new("ok", "123456", 1).validate().is_err());
        assert!(NewShip::new("ok", "12345a7", 1).validate().is_err());
        assert!(NewShip::new("ok", "1234567", 1)
            .with_status(ShipStatus::Deleted)
            .validate()
            .is_err());
    }

    #[test]
    fn test_name_limit_counts_characters() {
        let name = "é".repeat(SHIP_NAME_CHARS_MAX);
        assert!(NewShip::new(name, "1234567", 1).validate().is_ok());
    }

    #[test]
    fn test_apply_update_refreshes_modified() {
        let mut ship = sample_ship(1, "GOODSHIP COTTON");
        let created = ship.created;
        let later = created + chrono::Duration::seconds(5);

        ship.apply(ShipUpdate::new().notes("fun notes").user_id(1234), later)
            .unwrap();

        assert_eq!(ship.notes.as_deref(), Some("fun notes"));
        assert_eq!(ship.user_id, 1);
        assert_eq!(ship.created, created);
        assert_eq!(ship.modified, later);
    }

    #[test]
    fn test_apply_rejects_resurrection() {
        let mut ship = sample_ship(7, "GOODSHIP COTTON");
        ship.apply(ShipUpdate::deleted(), ship.created).unwrap();
        let before = ship.clone();

        let err = ship
            .apply(ShipUpdate::new().status(ShipStatus::Active), ship.created)
            .unwrap_err();

        assert!(matches!(err, ShipError::InvalidTransition { id: 7, .. }));
        assert_eq!(ship, before);
    }

    #[test]
    fn test_apply_rejects_invalid_values_untouched() {
        let mut ship = sample_ship(1, "GOODSHIP COTTON");
        let before = ship.clone();

        let result = ship.apply(ShipUpdate::new().name("renamed").imo_number("12"), ship.created);

        assert!(result.is_err());
        assert_eq!(ship, before);
    }

    #[test]
    fn test_update_deserialize_rejects_unknown_fields() {
        let err = serde_json::from_str::<ShipUpdate>(r#"{"tonnage": 5}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_update_deserialize_notes_states() {
        let absent: ShipUpdate = serde_json::from_str(r#"{"name": "A"}"#).unwrap();
        assert_eq!(absent.notes, None);

        let cleared: ShipUpdate = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: ShipUpdate = serde_json::from_str(r#"{"notes": "hi", "user_id": 9}"#).unwrap();
        assert_eq!(set.notes, Some(Some("hi".to_string())));
        assert_eq!(set.user_id, Some(9));
    }

    #[test]
    fn test_query_matches_and_sort() {
        let mut ships = vec![
            sample_ship(1, "Bravo"),
            sample_ship(2, "Alpha"),
            sample_ship(3, "Alpha"),
        ];
        ships[2].user_id = 2;

        let query = ShipQuery::new().user_ids([1]);
        assert!(query.matches(&ships[0]));
        assert!(!query.matches(&ships[2]));

        ShipQuery::new()
            .order_by(OrderBy::asc(ShipField::Name))
            .sort(&mut ships);
        let ids: Vec<_> = ships.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        ShipQuery::new()
            .order_by(OrderBy::desc(ShipField::Name))
            .sort(&mut ships);
        let ids: Vec<_> = ships.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_ship_serializes_flat_record() {
        let ship = sample_ship(1, "GOODSHIP COTTON");
        let value = serde_json::to_value(&ship).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["created", "id", "imo_number", "modified", "name", "notes", "status", "user_id"]
        );
        assert_eq!(ship.to_string(), "GOODSHIP COTTON -- 1234567");
    }
}
