//! Connection pool and schema management.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::metrics::record_pool_metrics;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

/// Open a PostgreSQL pool.
pub async fn create_pool(settings: &PoolSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.connect_timeout)
        .idle_timeout(settings.idle_timeout)
        .connect(&settings.url)
        .await?;
    record_pool_metrics(&pool);
    Ok(pool)
}

/// Apply the embedded `participants`/`scans` schema.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("./src/migrations").run(pool).await?;
    info!("Migrations completed");
    Ok(())
}
