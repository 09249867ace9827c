//! # Postgres store
//!
//! This module implements the data mapping between the Postgres relational
//! model and the `domains` models. Queries are built at runtime and rows are
//! mapped by column name, so no database is needed at compile time.

mod ads;
mod categories;
mod favorites;
mod images;
mod users;

use domains::DomainError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }
}

/// Constraint violations the repositories translate into domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation {
    Unique,
    ForeignKey,
}

pub(crate) fn violation(err: &sqlx::Error) -> Option<Violation> {
    let db = err.as_database_error()?;
    if db.is_unique_violation() {
        Some(Violation::Unique)
    } else if db.is_foreign_key_violation() {
        Some(Violation::ForeignKey)
    } else {
        None
    }
}

/// Maps sqlx failures onto the domain taxonomy. Unique violations become
/// conflicts, dangling references become bad requests, and everything else
/// is an infrastructure failure.
pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    match violation(&err) {
        Some(Violation::Unique) => DomainError::Conflict(database_message(&err)),
        Some(Violation::ForeignKey) => DomainError::BadRequest(format!(
            "referenced row does not exist: {}",
            database_message(&err)
        )),
        None => DomainError::internal(err),
    }
}

fn database_message(err: &sqlx::Error) -> String {
    err.as_database_error()
        .map(|db| db.message().to_string())
        .unwrap_or_default()
}
