//! Database layer for the awards service.
//!
//! Entities, migrations and repositories over sea-orm. Repositories return
//! [`AppResult`]; raw [`DbErr`]s are converted with [`db_err`].

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use awards_common::{AppError, AppResult, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt).await.map_err(db_err)
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None).await.map_err(db_err)
}

/// Convert a sea-orm error into an [`AppError`].
///
/// Constraint violations become [`AppError::Conflict`] so callers can give
/// them a domain meaning (a duplicate vote, a category still referenced by
/// votes). Everything else is a gateway failure.
#[must_use]
pub fn db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg) | SqlErr::ForeignKeyConstraintViolation(msg)) => {
            AppError::Conflict(msg)
        }
        _ => match err {
            DbErr::RecordNotFound(msg) => AppError::NotFound(msg),
            other => AppError::BackendUnavailable(other.to_string()),
        },
    }
}
