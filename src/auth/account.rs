//! Account maintenance: password changes, profile updates, deactivation,
//! soft deletion, and administrative listing.

use std::sync::Arc;
use tracing::info;

use crate::cache::Cache;
use crate::db::{SessionStore, User, UserStore};

use super::error::AuthError;
use super::password::{hash_password, verify_password};

pub struct AccountService {
    users: UserStore,
    sessions: SessionStore,
    cache: Arc<Cache>,
}

impl AccountService {
    pub fn new(users: UserStore, sessions: SessionStore, cache: Arc<Cache>) -> Self {
        Self {
            users,
            sessions,
            cache,
        }
    }

    /// Rehash after verifying the current password. Existing sessions are
    /// left alive; the bearer token itself is unaffected.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < 6 {
            return Err(AuthError::validation(
                "new_password",
                "Password must be at least 6 characters",
            ));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(current_password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password)?;
        self.users.update_password(user_id, &new_hash).await?;
        self.cache.evict_user(user_id);

        info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        if first_name.len() > 50 {
            return Err(AuthError::validation(
                "first_name",
                "First name must be at most 50 characters",
            ));
        }
        if last_name.len() > 50 {
            return Err(AuthError::validation(
                "last_name",
                "Last name must be at most 50 characters",
            ));
        }

        let user = self
            .users
            .update_profile(user_id, first_name, last_name)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.cache.evict_user(user_id);
        Ok(user)
    }

    /// Flip the account inactive. Outstanding tokens die on their next
    /// validation; session rows are left for the sweep.
    pub async fn deactivate(&self, user_id: i64) -> Result<(), AuthError> {
        self.users.set_active(user_id, false).await?;
        self.cache.evict_user(user_id);
        info!(user_id, "Account deactivated");
        Ok(())
    }

    /// Soft delete plus session mass revoke.
    pub async fn delete_account(&self, user_id: i64) -> Result<(), AuthError> {
        self.users.soft_delete(user_id).await?;
        self.sessions.delete_all_for_user(user_id).await?;
        self.cache.evict_user(user_id);
        info!(user_id, "Account deleted");
        Ok(())
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, AuthError> {
        if let Some(user) = self.cache.get_user(user_id) {
            return Ok(user);
        }
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(user)
    }

    pub async fn list_users(&self, offset: i64, limit: i64) -> Result<(Vec<User>, i64), AuthError> {
        let users = self.users.list(offset, limit).await?;
        let total = self.users.count().await?;
        Ok((users, total))
    }
}
