// src/db.rs
use log::{LevelFilter, info};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::ConnectOptions;
use std::time::Duration;

use crate::config::DatabaseSettings;

const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct Database {
    pub pool: MySqlPool,
}

impl Database {
    /// Open the pool and make sure at least one connection can be established.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let options = Self::connect_options(settings)?;
        let pool = Self::pool_options(settings).connect_with(options).await?;

        info!(
            "Database pool ready (max_open={}, max_idle_time={:?})",
            settings.max_open_connections,
            settings.max_idle_time()
        );

        Ok(Database { pool })
    }

    /// Build the pool without touching the server. Connections are opened on first use.
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let options = Self::connect_options(settings)?;
        let pool = Self::pool_options(settings).connect_lazy_with(options);
        Ok(Database { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }

    fn connect_options(settings: &DatabaseSettings) -> Result<MySqlConnectOptions, sqlx::Error> {
        let options = settings
            .url
            .parse::<MySqlConnectOptions>()?
            .log_statements(LevelFilter::Info)
            .log_slow_statements(LevelFilter::Warn, SLOW_STATEMENT_THRESHOLD);
        Ok(options)
    }

    // sqlx cannot cap idle connections; the idle timeout is what bounds them.
    // No idle floor either, so every idle connection is reaped after max_idle_time.
    fn pool_options(settings: &DatabaseSettings) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(settings.max_open_connections)
            .min_connections(0)
            .idle_timeout(settings.max_idle_time())
            .acquire_timeout(settings.acquire_timeout())
    }
}
