//! Ships API endpoints
//!
//! TigerStyle: Owner-scoped list/create/retrieve/destroy.
//!
//! The caller only ever sees their own ships: every query is pinned to the
//! authenticated user, and a ship owned by someone else answers 404.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::auth::AuthenticatedUser;
use super::{ApiError, AppState};
use crate::constants::{LIST_LIMIT_DEFAULT, LIST_LIMIT_MAX};
use crate::ship::{NewShip, OrderBy, Ship, ShipId, ShipQuery, ShipStatus};

/// Create ships routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ships).post(create_ship))
        .route("/:ship_id", get(get_ship).delete(delete_ship))
}

// =============================================================================
// Wire Types
// =============================================================================

/// A ship as returned to its owner. The owner id is write-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipView {
    pub id: ShipId,
    pub name: String,
    pub imo_number: String,
    pub status: ShipStatus,
    pub notes: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<Ship> for ShipView {
    fn from(ship: Ship) -> Self {
        Self {
            id: ship.id,
            name: ship.name,
            imo_number: ship.imo_number,
            status: ship.status,
            notes: ship.notes,
            created: ship.created,
            modified: ship.modified,
        }
    }
}

/// Request body for creating a ship
#[derive(Debug, Deserialize)]
pub struct CreateShipRequest {
    pub name: String,
    pub imo_number: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query parameters for listing ships
#[derive(Debug, Default, Deserialize)]
pub struct ListShipsQuery {
    /// Page size (default 20, max 1000)
    pub limit: Option<usize>,
    /// Number of matches to skip
    pub offset: Option<usize>,
    pub id: Option<ShipId>,
    /// Comma-separated ship ids
    pub ids: Option<String>,
    pub status: Option<String>,
    /// Field name, `-` prefix for descending
    pub order_by: Option<String>,
}

impl ListShipsQuery {
    /// Turn the raw parameters into a storage query for `user_id`.
    fn to_ship_query(&self, user_id: u32) -> Result<ShipQuery, ApiError> {
        let mut query = ShipQuery::new().user_ids([user_id]);

        if let Some(id) = self.id {
            query = query.id(id);
        }
        if let Some(ids) = self.ids.as_deref().filter(|s| !s.trim().is_empty()) {
            let ids = ids
                .split(',')
                .map(|id| id.trim().parse::<ShipId>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ApiError::bad_request(format!("invalid ids: {ids}")))?;
            query = query.ids(ids);
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            query = query.status(status.parse::<ShipStatus>()?);
        }
        if let Some(order_by) = self.order_by.as_deref().filter(|s| !s.is_empty()) {
            query = query.order_by(order_by.parse::<OrderBy>()?);
        }

        Ok(query)
    }
}

/// One page of ships
#[derive(Debug, Serialize, Deserialize)]
pub struct ListShipsResponse {
    /// Matches before pagination
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
    pub results: Vec<ShipView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List the caller's ships
///
/// GET /api/v1/ships?limit={limit}&offset={offset}&status={status}&order_by={field}
#[instrument(skip(state, query), fields(user_id = user.user_id), level = "info")]
async fn list_ships(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    query: Result<Query<ListShipsQuery>, QueryRejection>,
) -> Result<Json<ListShipsResponse>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(LIST_LIMIT_DEFAULT);
    if limit == 0 || limit > LIST_LIMIT_MAX {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {LIST_LIMIT_MAX}"
        )));
    }
    let offset = query.offset.unwrap_or(0);

    let ship_query = query.to_ship_query(user.user_id)?;
    let (ships, count) = state.logic.get_ships(&ship_query).await?;

    let results = ships
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(ShipView::from)
        .collect();

    Ok(Json(ListShipsResponse {
        count,
        limit,
        offset,
        results,
    }))
}

/// Create a ship owned by the caller
///
/// POST /api/v1/ships
#[instrument(skip(state, request), fields(user_id = user.user_id), level = "info")]
async fn create_ship(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    request: Result<Json<CreateShipRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShipView>), ApiError> {
    let Json(request) = request?;
    // The owner is always the caller, whatever the body says.
    let mut new = NewShip::new(request.name, request.imo_number, user.user_id);
    new.notes = request.notes;

    let ship = state.logic.create_ship(new).await?;

    Ok((StatusCode::CREATED, Json(ship.into())))
}

/// Get one of the caller's ships
///
/// GET /api/v1/ships/{ship_id}
#[instrument(skip(state, ship_id), fields(user_id = user.user_id), level = "info")]
async fn get_ship(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ship_id: Result<Path<ShipId>, PathRejection>,
) -> Result<Json<ShipView>, ApiError> {
    let Path(ship_id) = ship_id?;
    let ship = find_owned(&state, user, ship_id).await?;
    Ok(Json(ship.into()))
}

/// Soft delete one of the caller's ships
///
/// DELETE /api/v1/ships/{ship_id}
#[instrument(skip(state, ship_id), fields(user_id = user.user_id), level = "info")]
async fn delete_ship(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ship_id: Result<Path<ShipId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(ship_id) = ship_id?;
    find_owned(&state, user, ship_id).await?;
    state.logic.delete_ship(ship_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_owned(
    state: &AppState,
    user: AuthenticatedUser,
    ship_id: ShipId,
) -> Result<Ship, ApiError> {
    let query = ShipQuery::new().id(ship_id).user_ids([user.user_id]);
    let (ships, _) = state.logic.get_ships(&query).await?;
    ships
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(format!("ship not found: {ship_id}")))
}
