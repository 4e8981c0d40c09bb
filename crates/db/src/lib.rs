//! Persistence layer for the carpool rides service.
//!
//! Exposes the entity models, the [`store::BookingStore`] trait, and two
//! implementations: [`store::PgBookingStore`] (Postgres, explicit
//! transactions with row locks) and [`store::MemoryBookingStore`] (in-memory
//! fake for tests and local development).

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod store;

/// Database connection pool type used across the workspace.
pub type DbPool = sqlx::PgPool;

/// Create a connection pool against the given Postgres URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Cheap connectivity probe, used at startup and by the readiness endpoint.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
