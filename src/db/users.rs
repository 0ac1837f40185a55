//! User persistence over the shared SQLite pool.
//!
//! Uniqueness of email (case-insensitive) and username is enforced by the
//! UNIQUE constraints in the schema; `create` maps those violations back to
//! distinct error variants so callers can tell the two conflicts apart.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{DbPool, User};

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    EmailTaken,
    #[error("username already taken")]
    UsernameTaken,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: DbPool,
}

impl UserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new user. The UNIQUE constraints are the authoritative
    /// uniqueness guarantee; pre-checks done by callers are advisory.
    pub async fn create(&self, new_user: NewUser) -> Result<User, CreateUserError> {
        let now = Utc::now();
        let result: Result<User, sqlx::Error> = sqlx::query_as(
            "INSERT INTO users (email, username, password_hash, first_name, last_name, \
             is_active, is_admin, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, 0, ?, ?) \
             RETURNING *",
        )
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        result.map_err(|e| match &e {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("users.email") {
                    CreateUserError::EmailTaken
                } else if msg.contains("users.username") {
                    CreateUserError::UsernameTaken
                } else {
                    CreateUserError::Db(e)
                }
            }
            _ => CreateUserError::Db(e),
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Email comparison is case-insensitive via the column's NOCASE collation.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE email = ? AND deleted_at IS NULL")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM users WHERE username = ? AND deleted_at IS NULL")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn update_profile(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE users SET first_name = ?, last_name = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL \
             RETURNING *",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_last_login(
        &self,
        id: i64,
        when: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(when)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Soft delete: the row is flagged, never physically erased.
    pub async fn soft_delete(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET deleted_at = ?, is_active = 0 WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM users WHERE deleted_at IS NULL ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
