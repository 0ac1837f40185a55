//! Token validation against live account state, refresh, logout, and the
//! expiry sweep.
//!
//! Validation never trusts the claims embedded in a token for current state:
//! after the signature and expiry check, the user record is re-read from the
//! store. Deactivating an account therefore invalidates all its outstanding
//! tokens on their next use, with no token blocklist.

use chrono::Duration;
use std::sync::Arc;
use tracing::warn;

use crate::cache::Cache;
use crate::db::{AuthResponse, Session, SessionStore, User, UserStore};

use super::error::AuthError;
use super::token::TokenManager;

pub struct SessionService {
    users: UserStore,
    sessions: SessionStore,
    cache: Arc<Cache>,
    tokens: Arc<TokenManager>,
}

impl SessionService {
    pub fn new(
        users: UserStore,
        sessions: SessionStore,
        cache: Arc<Cache>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            users,
            sessions,
            cache,
            tokens,
        }
    }

    /// Verify a bearer token and return the live user record.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.validate_token(token)?;

        // Fresh read: the sole revocation mechanism.
        let user = self
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::Deactivated);
        }

        Ok(user)
    }

    /// Issue a new token built from the current user record, never from the
    /// decoded claims of the presented token. The old token stays valid until
    /// its own expiry.
    pub async fn refresh_token(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let user = self.validate_token(token).await?;

        let (new_token, expires_at) =
            self.tokens
                .generate_token(user.id, &user.username, &user.email, user.is_admin)?;

        Ok(AuthResponse {
            token: new_token,
            user,
            expires_at,
            session_id: None,
        })
    }

    /// Terminate the named session only. Cache eviction is best-effort.
    pub async fn logout(&self, user_id: i64, session_id: &str) -> Result<(), AuthError> {
        if !self.sessions.delete(user_id, session_id).await? {
            warn!(user_id, "Logout for unknown session");
        }
        self.cache.evict_user(user_id);
        Ok(())
    }

    /// Push an active session's expiry forward.
    pub async fn extend_session(
        &self,
        user_id: i64,
        session_id: &str,
        duration: Duration,
    ) -> Result<Session, AuthError> {
        self.sessions
            .extend(user_id, session_id, duration)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    /// Bulk-delete every session past its expiry. Safe to run concurrently
    /// with logins.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthError> {
        let removed = self.sessions.delete_expired().await?;
        Ok(removed)
    }

    pub async fn get_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        let sessions = self.sessions.list_by_user(user_id).await?;
        Ok(sessions)
    }

    /// Administrative mass revoke.
    pub async fn delete_all_user_sessions(&self, user_id: i64) -> Result<u64, AuthError> {
        let removed = self.sessions.delete_all_for_user(user_id).await?;
        self.cache.evict_user(user_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::login::LoginService;
    use crate::auth::password::hash_password;
    use crate::db::users::NewUser;
    use crate::db::{test_pool, DbPool};

    fn token_manager(lifetime: Duration) -> Arc<TokenManager> {
        Arc::new(TokenManager::new("test-secret", lifetime, "gatekeeper"))
    }

    fn service_with(pool: &DbPool, tokens: Arc<TokenManager>) -> SessionService {
        SessionService::new(
            UserStore::new(pool.clone()),
            SessionStore::new(pool.clone()),
            Arc::new(Cache::new()),
            tokens,
        )
    }

    async fn seed_and_login(pool: &DbPool, tokens: Arc<TokenManager>) -> (i64, AuthResponse) {
        let user_id = UserStore::new(pool.clone())
            .create(NewUser {
                email: "a@x.com".into(),
                username: "alice".into(),
                password_hash: hash_password("Secret123").unwrap(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .unwrap()
            .id;
        let login = LoginService::new(
            UserStore::new(pool.clone()),
            SessionStore::new(pool.clone()),
            Arc::new(Cache::new()),
            tokens,
            Duration::hours(24),
        );
        let response = login
            .login("a@x.com", "Secret123", "127.0.0.1", "test")
            .await
            .unwrap();
        (user_id, response)
    }

    #[tokio::test]
    async fn validate_returns_live_user() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, auth) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens);

        let user = svc.validate_token(&auth.token).await.unwrap();
        assert_eq!(user.id, user_id);
    }

    #[tokio::test]
    async fn deactivation_invalidates_unexpired_token() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, auth) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens);

        UserStore::new(pool.clone())
            .set_active(user_id, false)
            .await
            .unwrap();

        let err = svc.validate_token(&auth.token).await.unwrap_err();
        assert!(matches!(err, AuthError::Deactivated));
    }

    #[tokio::test]
    async fn deleted_user_is_not_found() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, auth) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens);

        UserStore::new(pool.clone())
            .soft_delete(user_id)
            .await
            .unwrap();

        let err = svc.validate_token(&auth.token).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn refresh_reads_current_state_not_claims() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, auth) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens);

        // Mutate the profile after the original token was issued.
        UserStore::new(pool.clone())
            .update_profile(user_id, "New", "Name")
            .await
            .unwrap();

        let refreshed = svc.refresh_token(&auth.token).await.unwrap();
        assert_eq!(refreshed.user.first_name, "New");
        assert_ne!(refreshed.token, auth.token);
    }

    #[tokio::test]
    async fn refresh_extends_expiry_and_keeps_old_token_valid() {
        let pool = test_pool().await;
        // Issue the original token from a short-lived manager sharing the
        // secret, then refresh through the hour-lived service.
        let short = token_manager(Duration::seconds(600));
        let long = token_manager(Duration::hours(1));
        let (_, auth) = seed_and_login(&pool, short).await;
        let svc = service_with(&pool, long);

        let refreshed = svc.refresh_token(&auth.token).await.unwrap();
        assert!(refreshed.expires_at > auth.expires_at);

        // The source token is not revoked by the refresh.
        assert!(svc.validate_token(&auth.token).await.is_ok());
    }

    #[tokio::test]
    async fn logout_kills_only_the_named_session() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, first) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens.clone());

        // A second concurrent session for the same user.
        let login = LoginService::new(
            UserStore::new(pool.clone()),
            SessionStore::new(pool.clone()),
            Arc::new(Cache::new()),
            tokens,
            Duration::hours(24),
        );
        let second = login.login("a@x.com", "Secret123", "", "").await.unwrap();

        let first_session = first.session_id.unwrap();
        svc.logout(user_id, &first_session).await.unwrap();

        let store = SessionStore::new(pool);
        assert!(store.find_by_token(&first_session).await.unwrap().is_none());
        assert!(store
            .find_by_token(&second.session_id.unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn admin_queries_list_and_mass_revoke() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, _) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens.clone());

        let login = LoginService::new(
            UserStore::new(pool.clone()),
            SessionStore::new(pool.clone()),
            Arc::new(Cache::new()),
            tokens,
            Duration::hours(24),
        );
        login.login("a@x.com", "Secret123", "", "").await.unwrap();

        assert_eq!(svc.get_user_sessions(user_id).await.unwrap().len(), 2);
        assert_eq!(svc.delete_all_user_sessions(user_id).await.unwrap(), 2);
        assert!(svc.get_user_sessions(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn extend_rejects_unknown_session() {
        let pool = test_pool().await;
        let tokens = token_manager(Duration::hours(1));
        let (user_id, auth) = seed_and_login(&pool, tokens.clone()).await;
        let svc = service_with(&pool, tokens);

        let extended = svc
            .extend_session(user_id, &auth.session_id.unwrap(), Duration::hours(48))
            .await
            .unwrap();
        assert!(extended.expires_at > auth.expires_at);

        let err = svc
            .extend_session(user_id, "no-such-session", Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionNotFound));
    }
}
