//! Credential verification and session creation.

use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::warn;

use crate::cache::Cache;
use crate::db::sessions::NewSession;
use crate::db::{AuthResponse, SessionStore, UserStore};

use super::error::AuthError;
use super::password::verify_password;
use super::token::TokenManager;

/// How long a cached user entry stays warm after a login.
const USER_CACHE_TTL: std::time::Duration = std::time::Duration::from_secs(30 * 60);

pub struct LoginService {
    users: UserStore,
    sessions: SessionStore,
    cache: Arc<Cache>,
    tokens: Arc<TokenManager>,
    session_lifetime: Duration,
}

impl LoginService {
    pub fn new(
        users: UserStore,
        sessions: SessionStore,
        cache: Arc<Cache>,
        tokens: Arc<TokenManager>,
        session_lifetime: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            cache,
            tokens,
            session_lifetime,
        }
    }

    /// Authenticate credentials and open a session.
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`;
    /// the response never reveals whether the email exists.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<AuthResponse, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::Deactivated);
        }

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let (token, expires_at) =
            self.tokens
                .generate_token(user.id, &user.username, &user.email, user.is_admin)?;

        let session_token = generate_session_token();
        self.sessions
            .create(NewSession {
                user_id: user.id,
                token: session_token.clone(),
                expires_at: Utc::now() + self.session_lifetime,
                ip_address: ip_address.to_string(),
                user_agent: user_agent.to_string(),
            })
            .await?;

        // Login bookkeeping is best-effort; a failed write never fails the login.
        let mut user = user;
        let now = Utc::now();
        if let Err(e) = self.users.update_last_login(user.id, now).await {
            warn!(user_id = user.id, error = %e, "Failed to update last login");
        } else {
            user.last_login = Some(now);
        }

        self.cache.set_user(&user, USER_CACHE_TTL);

        Ok(AuthResponse {
            token,
            user,
            expires_at,
            session_id: Some(session_token),
        })
    }
}

/// 256 bits from the OS CSPRNG, hex encoded. Session identifiers must never
/// be derivable from time or a counter.
fn generate_session_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}
