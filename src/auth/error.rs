use thiserror::Error;

use crate::db::users::CreateUserError;

/// Token verification failures, one variant per rejection class.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// The error taxonomy of the auth core.
///
/// Unknown email and wrong password are merged into the single
/// `InvalidCredentials` variant so failure responses never reveal whether an
/// email exists.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("account is deactivated")]
    Deactivated,
    #[error("user not found")]
    UserNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("admin access required")]
    Forbidden,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
    #[error("failed to hash password")]
    PasswordHash,
    #[error("database error")]
    Store(#[from] sqlx::Error),
}

impl AuthError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field, message }
    }
}

impl From<CreateUserError> for AuthError {
    fn from(err: CreateUserError) -> Self {
        match err {
            CreateUserError::EmailTaken => AuthError::EmailTaken,
            CreateUserError::UsernameTaken => AuthError::UsernameTaken,
            CreateUserError::Db(e) => AuthError::Store(e),
        }
    }
}
