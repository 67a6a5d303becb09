//! Relational metadata store for provisioned repositories.
//!
//! The service talks to its database through sqlx's `Any` driver so the same
//! queries run against PostgreSQL in production and SQLite in tests.  Every
//! statement is parameterised.

use anyhow::{Context, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyConnection, AnyPool};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::repository::RepositoryRecord;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS repository (\
    id TEXT PRIMARY KEY, \
    name TEXT NOT NULL, \
    code TEXT NOT NULL, \
    description TEXT NOT NULL DEFAULT '', \
    path TEXT NOT NULL UNIQUE\
)";

const INSERT_REPOSITORY: &str =
    "INSERT INTO repository (id, name, code, description, path) VALUES ($1, $2, $3, $4, $5)";

// ---------------------------------------------------------------------------
// Pool setup
// ---------------------------------------------------------------------------

/// Connect to the database described by `config`.
///
/// At least one connection is established before returning, so an
/// unreachable database fails startup rather than the first request.
pub async fn build_db_pool(config: &DatabaseConfig) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.conninfo)
        .await
        .context("failed to connect to database")?;

    info!(
        max_connections = config.max_connections,
        "database pool initialised"
    );
    Ok(pool)
}

/// Create the `repository` table if it does not exist yet.
pub async fn migrate(pool: &AnyPool) -> Result<()> {
    sqlx::query(CREATE_TABLE)
        .execute(pool)
        .await
        .context("failed to create repository table")?;
    debug!("repository schema ready");
    Ok(())
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// Insert `record` on `conn`.  Callers pass the connection behind an open
/// transaction; nothing here commits.
pub async fn insert_repository(
    conn: &mut AnyConnection,
    record: &RepositoryRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_REPOSITORY)
        .bind(record.id.as_str())
        .bind(record.name.as_str())
        .bind(record.code.as_str())
        .bind(record.description.as_str())
        .bind(record.path.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

/// Number of committed records.  The health endpoint also uses it as its
/// database check.
pub async fn count_repositories(pool: &AnyPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM repository")
        .fetch_one(pool)
        .await
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::Row;

    use super::*;

    const SELECT_REPOSITORY: &str =
        "SELECT id, name, code, description, path FROM repository WHERE id = $1";

    /// A migrated SQLite database living inside `dir`.
    ///
    /// A single pooled connection keeps SQLite's single-writer rule from
    /// surfacing as `database is locked` under concurrent requests.
    pub async fn sqlite_pool(dir: &std::path::Path) -> AnyPool {
        let config = DatabaseConfig {
            conninfo: format!("sqlite://{}?mode=rwc", dir.join("meta.db").display()),
            max_connections: 1,
            acquire_timeout_secs: 30,
        };
        let pool = build_db_pool(&config).await.unwrap();
        migrate(&pool).await.unwrap();
        pool
    }

    /// Fetch a committed record by id.
    pub async fn find_repository(
        pool: &AnyPool,
        id: &str,
    ) -> Result<Option<RepositoryRecord>, sqlx::Error> {
        let row = sqlx::query(SELECT_REPOSITORY)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.map(|row| -> Result<RepositoryRecord, sqlx::Error> {
            Ok(RepositoryRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                code: row.try_get("code")?,
                description: row.try_get("description")?,
                path: row.try_get("path")?,
            })
        })
        .transpose()
    }
}
