//! Database setup and initialization

use anyhow::{Context, Result};
use fentity_core::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Connect to the configured database and apply pending migrations
pub async fn setup_database(config: &Config) -> Result<SqlitePool> {
    tracing::info!("Connecting to database...");

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("Invalid DATABASE_URL: {}", config.database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // An in-memory database lives only as long as its single connection
    let in_memory = config.database_url.contains(":memory:");
    let max_connections = if in_memory { 1 } else { config.db_max_connections };

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30));
    if in_memory {
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(max_connections, "Database connected successfully");

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Fresh, migrated in-memory database (tests and throwaway CLI runs)
pub async fn setup_in_memory() -> Result<SqlitePool> {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        ..Config::default()
    };
    setup_database(&config).await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
