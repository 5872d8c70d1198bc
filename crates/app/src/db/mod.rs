//! Database operations.
//!
//! # Schema: `growth_pilot`
//!
//! ## Tables
//!
//! - `shop_sessions` - Installed shops and their offline access tokens
//! - `shop_settings` - Per-shop preferences (JSONB, keyed by section)
//! - `shop_plans` - Billing plan and subscription per shop
//! - `ai_usage` - AI analyses run per shop per month
//!
//! Browser sessions live in `tower_sessions.session`, managed by
//! `tower-sessions-sqlx-store`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/app/migrations/` and run via:
//! ```bash
//! cargo run -p growth-pilot-cli -- migrate
//! ```
//! or at startup with `RUN_MIGRATIONS=true`.

pub mod plans;
pub mod settings;
pub mod shop_sessions;
pub mod usage;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use plans::PlanRepository;
pub use settings::SettingsRepository;
pub use shop_sessions::ShopSessionRepository;
pub use usage::UsageRepository;

/// Embedded migrations for the app schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Current usage period, `YYYY-MM` in UTC.
#[must_use]
pub fn usage_period(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y-%m").to_string()
}
