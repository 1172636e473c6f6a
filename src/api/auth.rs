//! Token Authentication
//!
//! TigerStyle: Secure-by-default caller identification.
//!
//! Every `/api/v1/*` request must carry a token, either in the header
//! (`Authorization: Token <t>` or `Authorization: Bearer <t>`) or in the
//! query string (`?token=<t>`). Tokens map to user ids through a static
//! table taken from configuration (`SHIPS_API_TOKENS="t1:1,t2:666"`).
//! An empty table authenticates nobody.

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::header;
use axum::http::request::Parts;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::config::ConfigError;
use crate::ship::UserId;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Header schemes accepted in front of a token
pub const AUTH_HEADER_SCHEMES: &[&str] = &["Token ", "Bearer "];

/// Query string parameter carrying a token
pub const AUTH_QUERY_PARAM: &str = "token";

// =============================================================================
// Token Table
// =============================================================================

/// Static token → user id table.
#[derive(Debug, Clone, Default)]
pub struct TokenAuth {
    tokens: HashMap<String, UserId>,
}

impl TokenAuth {
    /// Parse `token:user_id` pairs separated by commas. Blank input gives
    /// an empty table.
    pub fn parse(pairs: &str) -> Result<Self, ConfigError> {
        let mut tokens = HashMap::new();

        for entry in pairs.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || ConfigError::ApiToken {
                entry: entry.to_string(),
            };
            let (token, user_id) = entry.split_once(':').ok_or_else(invalid)?;
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid());
            }
            let user_id: UserId = user_id.trim().parse().map_err(|_| invalid())?;
            tokens.insert(token.to_string(), user_id);
        }

        if tokens.is_empty() {
            tracing::warn!("no api tokens configured, every request will be rejected");
        } else {
            tracing::info!(count = tokens.len(), "api token authentication enabled");
        }

        Ok(Self { tokens })
    }

    /// Build a table from explicit pairs.
    pub fn from_pairs<I, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, UserId)>,
        T: Into<String>,
    {
        Self {
            tokens: pairs.into_iter().map(|(t, u)| (t.into(), u)).collect(),
        }
    }

    /// The user a token belongs to.
    #[must_use]
    pub fn authenticate(&self, token: &str) -> Option<UserId> {
        self.tokens.get(token).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn token_from_header(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    AUTH_HEADER_SCHEMES
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(|token| token.trim().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match token_from_header(parts) {
            Some(token) => Some(token),
            None => Query::<TokenQuery>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|Query(query)| query.token),
        };

        let token = token.ok_or_else(|| {
            ApiError::unauthorized(format!(
                "authentication credentials were not provided (header or ?{AUTH_QUERY_PARAM}=)"
            ))
        })?;

        let user_id = state.auth.authenticate(&token).ok_or_else(|| {
            tracing::warn!("rejected unknown api token");
            ApiError::unauthorized("invalid token")
        })?;

        Ok(Self { user_id })
    }
}
