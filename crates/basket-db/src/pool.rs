//! # Cart Database Handle
//!
//! Opens the SQLite pool that backs the cart store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::file("basket.db")        DbConfig::in_memory()               │
//! │       │  WAL journal                     │  one pinned connection       │
//! │       │  synchronous = NORMAL            │  (the database dies with it) │
//! │       │  created if missing              │                              │
//! │       └──────────────┬───────────────────┘                              │
//! │                      ▼                                                  │
//! │        Database::new ──► SqlitePool ──► apply pending migrations        │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │        Database::carts() ──► CartRepository                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Carts are written at session boundaries only, so the pool stays small.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, SchemaStatus};
use crate::repository::cart::CartRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the cart database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Private in-memory database, gone when the pool closes.
    Memory,
}

/// Cart database settings.
///
/// ## Example
/// ```rust
/// use basket_db::DbConfig;
/// use std::time::Duration;
///
/// let config = DbConfig::file("./basket.db")
///     .with_max_connections(2)
///     .with_acquire_timeout(Duration::from_secs(3));
/// assert!(!config.is_in_memory());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,
    pub max_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// Apply pending migrations when the pool opens.
    pub migrate: bool,
}

impl DbConfig {
    /// A database file, created on first use.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            location: DbLocation::File(path.into()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(10),
            migrate: true,
        }
    }

    /// A throwaway database for tests and replay runs.
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            migrate: true,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Skips migrations (the schema is managed elsewhere).
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == DbLocation::Memory
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        match &self.location {
            DbLocation::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string())),
            DbLocation::File(path) => Ok(file_options(path)),
        }
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout);

        match self.location {
            // The single connection must never be recycled
            DbLocation::Memory => options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
            DbLocation::File(_) => options.idle_timeout(Duration::from_secs(10 * 60)),
        }
    }
}

fn file_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
}

// =============================================================================
// Database
// =============================================================================

/// Open cart database. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(location = ?config.location, "Opening cart database");

        let pool = config
            .pool_options()
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(max_connections = config.max_connections, "Cart database pool ready");

        let db = Database { pool };
        if config.migrate {
            migrations::apply_pending(&db.pool).await?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository over the `carts` table.
    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone())
    }

    pub async fn schema_status(&self) -> DbResult<SchemaStatus> {
        migrations::schema_status(&self.pool).await
    }

    /// Whether the pool can still run a query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the pool. Every later repository call fails.
    pub async fn close(&self) {
        info!("Closing cart database");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
