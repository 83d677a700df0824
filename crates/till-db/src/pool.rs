//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Pool Shape
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path) ── Database::open(config).await               │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  ┌─────────────────────────────────────────┐                       │
//! │  │              SqlitePool                 │                       │
//! │  │   ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │  (max_connections)    │
//! │  │   │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │                       │
//! │  │   └─────┘ └─────┘ └─────┘ └─────┘       │                       │
//! │  └─────────────────────────────────────────┘                       │
//! │       │                                                            │
//! │       │ concurrent service operations, one connection each         │
//! │       ▼                                                            │
//! │  submit_invoice ──► Conn1     validate_return ──► Conn2            │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL journal mode is enabled so token lookups never block a committing
//! submission and vice versa.

use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::profile::ProfileRepository;
use crate::repository::shift::ShiftRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./data/till.db").max_connections(8);
/// let db = Database::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file. Created if missing.
    pub database_path: PathBuf,

    /// Maximum connections in the pool. Default: 5.
    pub max_connections: u32,

    /// How long to wait for a free connection. Default: 30s.
    pub acquire_timeout: Duration,

    /// Whether to run migrations when the pool is created. Default: true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration for a file-backed database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets whether migrations run at pool creation.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Configuration for an in-memory database (tests).
    ///
    /// A single connection, because each in-memory connection is its own
    /// database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone (wraps a pool); service types hold one each.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if necessary) the database and runs migrations.
    ///
    /// SQLite is configured for POS workloads: WAL journal, NORMAL
    /// synchronous, foreign keys on.
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "opening database");

        let connect_options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "pool created");

        let db = Database { pool };

        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }

        Ok(db)
    }

    /// The invoice repository.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    /// The shift repository.
    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone())
    }

    /// The profile settings repository.
    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.pool.clone())
    }

    /// Raw pool access, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool. All repository operations fail afterwards.
    pub async fn close(&self) {
        info!("closing database pool");
        self.pool.close().await;
    }

    /// True if the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        // Second run against an already-migrated pool must be a no-op.
        migrations::run_migrations(db.pool()).await.unwrap();
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/till.db")
            .max_connections(8)
            .run_migrations(false);

        assert_eq!(config.max_connections, 8);
        assert!(!config.run_migrations);
    }
}
