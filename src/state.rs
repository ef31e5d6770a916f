use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
    pub dashboard_cache: Cache<String, Value>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_pool = match config.database_url.as_deref() {
            Some(url) => {
                let options = PgConnectOptions::from_str(url)?;
                // Lazy connect so the binary boots (and the healthcheck
                // answers) even when the database is unreachable.
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_pool_max_connections)
                    .min_connections(config.db_pool_min_connections)
                    .acquire_timeout(Duration::from_secs(config.db_pool_acquire_timeout_seconds))
                    .idle_timeout(Duration::from_secs(config.db_pool_idle_timeout_seconds))
                    .connect_lazy_with(options);
                Some(pool)
            }
            None => {
                tracing::warn!("DATABASE_URL is not set — running without a database");
                None
            }
        };

        let dashboard_cache = Cache::builder()
            .max_capacity(config.dashboard_cache_max_entries)
            .time_to_live(Duration::from_secs(config.dashboard_cache_ttl_seconds))
            .build();

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            dashboard_cache,
        })
    }
}
