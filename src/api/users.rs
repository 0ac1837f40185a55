//! Administrative user and session endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::{Session, User};
use crate::AppState;

use super::auth::CurrentUser;
use super::error::ApiError;

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl ListQuery {
    /// A negative LIMIT means unbounded to SQLite, so clamp both values
    /// before they reach the store.
    fn normalize(&self) -> (i64, i64) {
        (self.offset.max(0), self.limit.clamp(0, MAX_PAGE_SIZE))
    }
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<Session>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RevokeSessionsResponse {
    pub revoked: u64,
}

/// List users with pagination
///
/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    require_admin(&caller)?;

    let (offset, limit) = query.normalize();
    let (users, total) = state.auth.list_users(offset, limit).await?;
    Ok(Json(ListUsersResponse { users, total }))
}

/// List a user's active sessions
///
/// GET /api/users/:id/sessions
pub async fn get_user_sessions(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    require_admin(&caller)?;

    let sessions = state.auth.get_user_sessions(user_id).await?;
    let total = sessions.len();
    Ok(Json(ListSessionsResponse { sessions, total }))
}

/// Mass-revoke every session of a user
///
/// DELETE /api/users/:id/sessions
pub async fn delete_user_sessions(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<RevokeSessionsResponse>, ApiError> {
    require_admin(&caller)?;

    let revoked = state.auth.delete_all_user_sessions(user_id).await?;
    info!(user_id, revoked, "Sessions revoked by admin");
    Ok(Json(RevokeSessionsResponse { revoked }))
}

/// Deactivate an account. Its outstanding tokens die on next validation.
///
/// POST /api/users/:id/deactivate
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&caller)?;

    state.auth.deactivate_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft-delete an account and revoke its sessions
///
/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&caller)?;

    state.auth.delete_account(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
