//! Best-effort in-process cache.
//!
//! A read-through optimization over `DashMap` with per-entry TTLs. The cache
//! is strictly advisory: a miss, an expired entry, or a dropped write never
//! changes the outcome of the operation that touched it. The persistent store
//! stays the single source of truth.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::db::User;

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

#[derive(Default)]
pub struct Cache {
    entries: DashMap<String, Entry>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        // Serialization failures are swallowed; the cache never fails a caller.
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every expired entry. Called opportunistically from the session
    /// sweep so stale entries do not accumulate unbounded.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn set_user(&self, user: &User, ttl: Duration) {
        self.set(&Self::user_key(user.id), user, ttl);
    }

    pub fn get_user(&self, user_id: i64) -> Option<User> {
        self.get(&Self::user_key(user_id))
    }

    pub fn evict_user(&self, user_id: i64) {
        self.delete(&Self::user_key(user_id));
    }

    fn user_key(user_id: i64) -> String {
        format!("user:{user_id}")
    }
}
