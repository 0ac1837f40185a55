//! The auth facade.
//!
//! One narrow surface over the login, registration, session, and account
//! services; it contains no logic of its own beyond the per-operation
//! deadline. Every call runs under a timeout, and an elapsed deadline
//! surfaces as `DeadlineExceeded`, never as a business error. Dropping the
//! returned future cancels the underlying store calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::cache::Cache;
use crate::config::AuthConfig;
use crate::db::{
    AuthResponse, DbPool, RegisterRequest, Session, SessionStore, User, UserStore,
};

use super::account::AccountService;
use super::error::AuthError;
use super::login::LoginService;
use super::register::RegistrationService;
use super::session::SessionService;
use super::token::TokenManager;

pub struct AuthService {
    login: LoginService,
    registration: RegistrationService,
    session: SessionService,
    account: AccountService,
    operation_timeout: StdDuration,
}

impl AuthService {
    pub fn new(pool: DbPool, cache: Arc<Cache>, config: &AuthConfig) -> Self {
        let users = UserStore::new(pool.clone());
        let sessions = SessionStore::new(pool);
        let tokens = Arc::new(TokenManager::new(
            &config.jwt_secret,
            config.token_lifetime(),
            &config.issuer,
        ));

        Self {
            login: LoginService::new(
                users.clone(),
                sessions.clone(),
                cache.clone(),
                tokens.clone(),
                config.session_lifetime(),
            ),
            registration: RegistrationService::new(users.clone(), tokens.clone()),
            session: SessionService::new(
                users.clone(),
                sessions.clone(),
                cache.clone(),
                tokens,
            ),
            account: AccountService::new(users, sessions, cache),
            operation_timeout: config.operation_timeout(),
        }
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<AuthResponse, AuthError> {
        self.bounded(self.login.login(email, password, ip_address, user_agent))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        self.bounded(self.registration.register(request)).await
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        self.bounded(self.session.validate_token(token)).await
    }

    pub async fn refresh_token(&self, token: &str) -> Result<AuthResponse, AuthError> {
        self.bounded(self.session.refresh_token(token)).await
    }

    pub async fn logout(&self, user_id: i64, session_id: &str) -> Result<(), AuthError> {
        self.bounded(self.session.logout(user_id, session_id)).await
    }

    pub async fn extend_session(
        &self,
        user_id: i64,
        session_id: &str,
        duration: chrono::Duration,
    ) -> Result<Session, AuthError> {
        self.bounded(self.session.extend_session(user_id, session_id, duration))
            .await
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AuthError> {
        self.bounded(self.session.cleanup_expired_sessions()).await
    }

    pub async fn get_user_sessions(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        self.bounded(self.session.get_user_sessions(user_id)).await
    }

    pub async fn delete_all_user_sessions(&self, user_id: i64) -> Result<u64, AuthError> {
        self.bounded(self.session.delete_all_user_sessions(user_id))
            .await
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.bounded(
            self.account
                .change_password(user_id, current_password, new_password),
        )
        .await
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        self.bounded(self.account.update_profile(user_id, first_name, last_name))
            .await
    }

    pub async fn deactivate_user(&self, user_id: i64) -> Result<(), AuthError> {
        self.bounded(self.account.deactivate(user_id)).await
    }

    pub async fn delete_account(&self, user_id: i64) -> Result<(), AuthError> {
        self.bounded(self.account.delete_account(user_id)).await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.bounded(self.account.get_user(user_id)).await
    }

    pub async fn list_users(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<User>, i64), AuthError> {
        self.bounded(self.account.list_users(offset, limit)).await
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::DeadlineExceeded),
        }
    }
}
