pub mod auth;
mod error;
mod users;

pub use error::{ApiError, ErrorCode};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public auth routes
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
        .route("/validate", get(auth::validate))
        .route("/me", get(auth::me))
        .route("/me", put(auth::update_profile))
        .route("/password", post(auth::change_password))
        .route("/sessions/extend", post(auth::extend_session));

    // Admin routes; handlers check the caller's admin flag themselves
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/:id", delete(users::delete_user))
        .route("/:id/deactivate", post(users::deactivate_user))
        .route("/:id/sessions", get(users::get_user_sessions))
        .route("/:id/sessions", delete(users::delete_user_sessions));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
