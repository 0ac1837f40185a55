//! Account creation.
//!
//! The email/username pre-checks are a fast-path rejection only; the
//! authoritative uniqueness guarantee is the store's UNIQUE constraints,
//! checked atomically at insert. A constraint violation that slips past the
//! pre-check (concurrent registration) maps to the same conflict errors.

use std::sync::Arc;

use crate::db::users::NewUser;
use crate::db::{AuthResponse, RegisterRequest, UserStore};

use super::error::AuthError;
use super::password::hash_password;
use super::token::TokenManager;

pub struct RegistrationService {
    users: UserStore,
    tokens: Arc<TokenManager>,
}

impl RegistrationService {
    pub fn new(users: UserStore, tokens: Arc<TokenManager>) -> Self {
        Self { users, tokens }
    }

    /// Create an account and immediately authenticate it. No session row is
    /// created; the caller logs in to open one.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, AuthError> {
        validate_register_request(request)?;

        // Optimistic pre-checks; racing registrations are caught by the
        // constraints at insert below.
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if self
            .users
            .find_by_username(&request.username)
            .await?
            .is_some()
        {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(&request.password)?;

        let user = self
            .users
            .create(NewUser {
                email: request.email.clone(),
                username: request.username.clone(),
                password_hash,
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
            })
            .await?;

        let (token, expires_at) =
            self.tokens
                .generate_token(user.id, &user.username, &user.email, user.is_admin)?;

        Ok(AuthResponse {
            token,
            user,
            expires_at,
            session_id: None,
        })
    }
}

fn validate_register_request(request: &RegisterRequest) -> Result<(), AuthError> {
    if request.email.is_empty() {
        return Err(AuthError::validation("email", "Email is required"));
    }
    if !request.email.contains('@') || request.email.len() > 254 {
        return Err(AuthError::validation("email", "Invalid email address"));
    }
    if request.username.len() < 3 {
        return Err(AuthError::validation(
            "username",
            "Username must be at least 3 characters",
        ));
    }
    if request.username.len() > 20 {
        return Err(AuthError::validation(
            "username",
            "Username must be at most 20 characters",
        ));
    }
    if request.password.len() < 6 {
        return Err(AuthError::validation(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    if request.first_name.len() > 50 {
        return Err(AuthError::validation(
            "first_name",
            "First name must be at most 50 characters",
        ));
    }
    if request.last_name.len() > 50 {
        return Err(AuthError::validation(
            "last_name",
            "Last name must be at most 50 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_pool, DbPool};
    use chrono::Duration;

    fn request(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: "Secret123".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
        }
    }

    fn service(pool: &DbPool) -> RegistrationService {
        RegistrationService::new(
            UserStore::new(pool.clone()),
            Arc::new(TokenManager::new(
                "test-secret",
                Duration::hours(1),
                "gatekeeper",
            )),
        )
    }

    #[tokio::test]
    async fn register_creates_authenticated_account() {
        let pool = test_pool().await;
        let svc = service(&pool);

        let result = svc.register(&request("a@x.com", "alice")).await.unwrap();
        assert_eq!(result.user.email, "a@x.com");
        assert!(result.user.is_active);
        assert!(!result.user.is_admin);
        assert!(result.session_id.is_none());
        assert!(!result.token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let pool = test_pool().await;
        let svc = service(&pool);
        svc.register(&request("a@x.com", "alice")).await.unwrap();

        let err = svc
            .register(&request("a@x.com", "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn duplicate_email_differing_in_case_conflicts() {
        let pool = test_pool().await;
        let svc = service(&pool);
        svc.register(&request("a@x.com", "alice")).await.unwrap();

        let err = svc
            .register(&request("A@X.com", "bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let pool = test_pool().await;
        let svc = service(&pool);
        svc.register(&request("a@x.com", "alice")).await.unwrap();

        let err = svc
            .register(&request("b@x.com", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let pool = test_pool().await;
        let svc = service(&pool);

        assert!(matches!(
            svc.register(&request("not-an-email", "alice")).await.unwrap_err(),
            AuthError::Validation { field: "email", .. }
        ));

        assert!(matches!(
            svc.register(&request("a@x.com", "ab")).await.unwrap_err(),
            AuthError::Validation {
                field: "username",
                ..
            }
        ));

        let mut short_password = request("a@x.com", "alice");
        short_password.password = "12345".into();
        assert!(matches!(
            svc.register(&short_password).await.unwrap_err(),
            AuthError::Validation {
                field: "password",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn stored_hash_is_not_the_password() {
        let pool = test_pool().await;
        let svc = service(&pool);

        svc.register(&request("a@x.com", "alice")).await.unwrap();
        let stored = UserStore::new(pool)
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "Secret123");
        assert!(stored.password_hash.starts_with("$argon2"));
    }
}
