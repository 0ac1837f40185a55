pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;

pub use db::DbPool;

use auth::AuthService;
use cache::Cache;
use config::Config;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub cache: Arc<Cache>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let cache = Arc::new(Cache::new());
        let auth = AuthService::new(db.clone(), cache.clone(), &config.auth);
        Self {
            config,
            db,
            cache,
            auth,
        }
    }
}
