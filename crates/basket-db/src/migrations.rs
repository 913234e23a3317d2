//! # Cart Store Schema
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`Database::new`](crate::Database::new).
//!
//! ```text
//! migrations/sqlite/
//!   001_carts.sql    carts(id, payload, item_count, created_at, updated_at)
//! ```
//!
//! Schema changes get a new `NNN_description.sql` file. Applied files are
//! checksummed by sqlx and must stay untouched.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Schema version summary, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatus {
    /// Migrations embedded in this build.
    pub known: usize,
    /// Migrations recorded as applied in the database.
    pub applied: usize,
    /// Highest applied version, if any.
    pub version: Option<i64>,
}

impl SchemaStatus {
    pub fn is_current(&self) -> bool {
        self.applied >= self.known
    }

    pub fn pending(&self) -> usize {
        self.known.saturating_sub(self.applied)
    }
}

/// Applies every pending migration.
pub(crate) async fn apply_pending(pool: &SqlitePool) -> DbResult<()> {
    debug!(known = MIGRATOR.migrations.len(), "Applying cart store migrations");
    MIGRATOR.run(pool).await?;
    info!("Cart store schema is current");
    Ok(())
}

/// Reads the applied schema version.
///
/// A database that was never migrated reports zero applied migrations
/// rather than an error.
pub async fn schema_status(pool: &SqlitePool) -> DbResult<SchemaStatus> {
    let row: Option<(i64, Option<i64>)> =
        sqlx::query_as("SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_optional(pool)
            .await
            .ok()
            .flatten();

    let (applied, version) = row.unwrap_or((0, None));
    Ok(SchemaStatus {
        known: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or(0),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_count() {
        let status = SchemaStatus {
            known: 3,
            applied: 1,
            version: Some(1),
        };
        assert_eq!(status.pending(), 2);
        assert!(!status.is_current());
    }

    #[tokio::test]
    async fn test_unmigrated_database_reports_zero() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let status = schema_status(&pool).await.unwrap();
        assert_eq!(status.applied, 0);
        assert_eq!(status.version, None);
        assert_eq!(status.pending(), status.known);
    }
}
