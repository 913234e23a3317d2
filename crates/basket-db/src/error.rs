//! # Cart Store Errors
//!
//! ```text
//! sqlx::Error ───────┐
//! MigrateError ──────┼──► DbError ──► ServiceError (basket-engine)
//! serde_json::Error ─┘                    │
//!   (payload)                             ▼
//!                      CartError::ExternalServiceUnavailable { Persistence }
//! ```
//!
//! A missing cart is not an error: `CartRepository::load` returns `None`.

use std::fmt;

use thiserror::Error;

/// Result type for cart store operations.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// The pool could not be opened.
    ///
    /// ## When This Occurs
    /// - Database directory missing or not writable
    /// - Invalid connection options
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite rejected a statement.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored cart payload could not be encoded or decoded.
    ///
    /// ## When This Occurs
    /// - Row written by an incompatible version of the cart model
    /// - Manual edits to the `payload` column
    #[error("Corrupt cart payload for {cart_id}: {message}")]
    CorruptPayload { cart_id: String, message: String },

    /// Every connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The pool was closed with [`Database::close`](crate::Database::close).
    #[error("Database is closed")]
    Closed,

    #[error("Database error: {0}")]
    Other(String),
}

impl DbError {
    pub fn corrupt(cart_id: impl Into<String>, err: impl fmt::Display) -> Self {
        DbError::CorruptPayload {
            cart_id: cart_id.into(),
            message: err.to_string(),
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::PoolExhausted | DbError::ConnectionFailed(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::Closed,
            sqlx::Error::Migrate(e) => DbError::MigrationFailed(e.to_string()),
            other => DbError::Other(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}
