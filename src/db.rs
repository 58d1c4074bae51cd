// src/db.rs
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::error::AppError;

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Opens the SQLite pool and applies pending migrations.
pub async fn init(database_url: &str) -> Result<SqlitePool, AppError> {
    let pool = connect(database_url).await?;
    MIGRATOR.run(&pool).await?;
    info!("Database ready at {}", database_url);
    Ok(pool)
}

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // An in-memory database lives inside a single connection; pooling more
    // than one would hand out empty databases.
    let is_memory = database_url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new();
    if is_memory {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        pool_options = pool_options.max_connections(5);
    }

    pool_options.connect_with(options).await
}
