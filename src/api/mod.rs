//! REST API module
//!
//! TigerStyle: Thin HTTP boundary over [`ShipLogic`]. Handlers parse,
//! authenticate and paginate; every decision about records stays in the
//! logic and storage layers.

pub mod auth;
pub mod ships;

use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::constants::APP_VERSION;
use crate::logic::ShipLogic;
use crate::ship::ShipError;
use crate::storage::StorageError;
use auth::TokenAuth;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub logic: ShipLogic,
    pub auth: Arc<TokenAuth>,
}

impl AppState {
    pub fn new(logic: ShipLogic, auth: TokenAuth) -> Self {
        Self {
            logic,
            auth: Arc::new(auth),
        }
    }
}

/// Create the API router with all routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/ships", ships::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: APP_VERSION.to_string(),
    })
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ShipError> for ApiError {
    fn from(err: ShipError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate { .. } => ApiError::conflict(err.to_string()),
            StorageError::NotFound { .. } => ApiError::not_found(err.to_string()),
            StorageError::Invalid(inner) => inner.into(),
            other => {
                tracing::error!(error = %other, "storage failure");
                ApiError::internal("internal storage error")
            }
        }
    }
}
