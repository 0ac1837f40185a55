//! Session persistence.
//!
//! Lookups filter on `is_active` and expiry, so a logged-out or swept session
//! is never resolvable again. The expiry sweep is a single bulk conditional
//! delete and only ever touches rows already past their expiry.

use chrono::{DateTime, Duration, Utc};

use super::{DbPool, Session};

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: DbPool,
}

impl SessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new_session: NewSession) -> Result<Session, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO sessions (user_id, token, expires_at, ip_address, user_agent, \
             is_active, created_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?) \
             RETURNING *",
        )
        .bind(new_session.user_id)
        .bind(&new_session.token)
        .bind(new_session.expires_at)
        .bind(&new_session.ip_address)
        .bind(&new_session.user_agent)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// Resolve a session by its opaque token, filtering out inactive and
    /// expired rows.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM sessions WHERE token = ? AND is_active = 1 AND expires_at > ?",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM sessions WHERE user_id = ? AND is_active = 1 AND expires_at > ? \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
    }

    /// Delete the named session only; other sessions of the same user are
    /// untouched. Returns whether a row was removed.
    pub async fn delete(&self, user_id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND token = ?")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Push an active session's expiry forward. Inactive sessions stay
    /// terminal. Returns the updated row if one matched.
    pub async fn extend(
        &self,
        user_id: i64,
        token: &str,
        duration: Duration,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as(
            "UPDATE sessions SET expires_at = ? \
             WHERE user_id = ? AND token = ? AND is_active = 1 AND expires_at > ? \
             RETURNING *",
        )
        .bind(Utc::now() + duration)
        .bind(user_id)
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Bulk-delete every session already past its expiry.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::db::users::{NewUser, UserStore};

    async fn seed_user(pool: &DbPool) -> i64 {
        let users = UserStore::new(pool.clone());
        users
            .create(NewUser {
                email: "a@x.com".into(),
                username: "alice".into(),
                password_hash: "$argon2id$opaque".into(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .unwrap()
            .id
    }

    fn session_for(user_id: i64, token: &str, expires_in: Duration) -> NewSession {
        NewSession {
            user_id,
            token: token.to_string(),
            expires_at: Utc::now() + expires_in,
            ip_address: "127.0.0.1".into(),
            user_agent: "test".into(),
        }
    }

    #[tokio::test]
    async fn create_and_resolve() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        store
            .create(session_for(user_id, "tok-1", Duration::hours(24)))
            .await
            .unwrap();

        let found = store.find_by_token("tok-1").await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn expired_session_is_not_resolvable() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        store
            .create(session_for(user_id, "tok-old", Duration::seconds(-5)))
            .await
            .unwrap();

        assert!(store.find_by_token("tok-old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_touches_only_named_session() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        store
            .create(session_for(user_id, "tok-a", Duration::hours(1)))
            .await
            .unwrap();
        store
            .create(session_for(user_id, "tok-b", Duration::hours(1)))
            .await
            .unwrap();

        assert!(store.delete(user_id, "tok-a").await.unwrap());
        assert!(store.find_by_token("tok-a").await.unwrap().is_none());
        assert!(store.find_by_token("tok-b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_requires_owning_user() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        store
            .create(session_for(user_id, "tok-a", Duration::hours(1)))
            .await
            .unwrap();

        assert!(!store.delete(user_id + 1, "tok-a").await.unwrap());
        assert!(store.find_by_token("tok-a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_removes_only_past_expiry_rows() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        store
            .create(session_for(user_id, "tok-dead", Duration::seconds(-60)))
            .await
            .unwrap();
        store
            .create(session_for(user_id, "tok-soon", Duration::seconds(1)))
            .await
            .unwrap();
        store
            .create(session_for(user_id, "tok-live", Duration::hours(1)))
            .await
            .unwrap();

        let removed = store.delete_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.find_by_token("tok-live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn extend_pushes_expiry_forward() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        let original = store
            .create(session_for(user_id, "tok-a", Duration::hours(1)))
            .await
            .unwrap();

        let extended = store
            .extend(user_id, "tok-a", Duration::hours(48))
            .await
            .unwrap()
            .unwrap();
        assert!(extended.expires_at > original.expires_at);
    }

    #[tokio::test]
    async fn delete_all_for_user_mass_revokes() {
        let pool = test_pool().await;
        let user_id = seed_user(&pool).await;
        let store = SessionStore::new(pool);

        for i in 0..3 {
            store
                .create(session_for(user_id, &format!("tok-{i}"), Duration::hours(1)))
                .await
                .unwrap();
        }

        assert_eq!(store.delete_all_for_user(user_id).await.unwrap(), 3);
        assert!(store.list_by_user(user_id).await.unwrap().is_empty());
    }
}
