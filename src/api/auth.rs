//! Authentication endpoints and the bearer-token extractor.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::db::{
    AuthResponse, LoginRequest, PasswordChangeRequest, ProfileUpdateRequest, RegisterRequest,
    Session, User,
};
use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtendSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Extract the bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Resolve the client IP, preferring proxy headers over the socket address
fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    if let Some(xff) = headers.get("X-Forwarded-For").and_then(|h| h.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(xri) = headers.get("X-Real-IP").and_then(|h| h.to_str().ok()) {
        return xri.to_string();
    }
    addr.ip().to_string()
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("User-Agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The authenticated caller, resolved from the bearer token against live
/// account state.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let user = state.auth.validate_token(token).await?;
        Ok(CurrentUser(user))
    }
}

/// Login endpoint
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let ip = client_ip(&headers, &addr);
    let agent = user_agent(&headers);

    let response = state
        .auth
        .login(&request.email, &request.password, &ip, &agent)
        .await?;

    info!(user_id = response.user.id, "User logged in");
    Ok(Json(response))
}

/// Registration endpoint
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = state.auth.register(&request).await?;
    info!(user_id = response.user.id, "User registered");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Logout endpoint. Requires the bearer token to identify the caller and the
/// session identifier to name the session; only that session is affected.
///
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.logout(user.id, &request.session_id).await?;
    info!(user_id = user.id, "User logged out");
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Token refresh endpoint. Issues a new token from current account state;
/// the presented token stays valid until its own expiry.
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, ApiError> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let response = state.auth.refresh_token(token).await?;
    Ok(Json(response))
}

/// Validate the presented token and return the live user record.
///
/// GET /api/auth/validate
pub async fn validate(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Current user's profile, served through the user cache.
///
/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<User>, ApiError> {
    let profile = state.auth.get_user(user.id).await?;
    Ok(Json(profile))
}

/// Update the caller's profile.
///
/// PUT /api/auth/me
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .auth
        .update_profile(user.id, &request.first_name, &request.last_name)
        .await?;
    Ok(Json(updated))
}

/// Change the caller's password after verifying the current one.
///
/// POST /api/auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<PasswordChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth
        .change_password(user.id, &request.current_password, &request.new_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "Password changed successfully".to_string(),
    }))
}

/// Extend one of the caller's sessions by the configured session lifetime.
///
/// POST /api/auth/sessions/extend
pub async fn extend_session(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ExtendSessionRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .auth
        .extend_session(
            user.id,
            &request.session_id,
            state.config.auth.session_lifetime(),
        )
        .await?;
    Ok(Json(session))
}
