//! The auth core: password hashing, bearer tokens, and revocable sessions.

pub mod account;
pub mod error;
pub mod login;
pub mod password;
pub mod register;
pub mod service;
pub mod session;
pub mod token;

pub use error::{AuthError, TokenError};
pub use service::AuthService;
pub use token::{Claims, TokenManager};
