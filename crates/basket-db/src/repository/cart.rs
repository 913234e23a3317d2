//! # Cart Repository
//!
//! Persists committed cart snapshots.
//!
//! ## Storage Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carts                                                                  │
//! │  ├── id          TEXT PK     cart id                                    │
//! │  ├── payload     TEXT        Cart as camelCase JSON                     │
//! │  ├── item_count  INTEGER     totalItems at save time (diagnostics)      │
//! │  ├── created_at  TEXT                                                   │
//! │  └── updated_at  TEXT                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository stores and returns snapshots as-is. Derived totals in a
//! loaded cart are whatever was saved; callers recompute them with their
//! current shipping rule before use.

use basket_core::{Cart, CartId};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for cart snapshots.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Loads a cart snapshot.
    ///
    /// ## Returns
    /// * `Ok(Some(cart))` - Cart found
    /// * `Ok(None)` - No cart stored under this id
    /// * `Err(DbError::CorruptPayload)` - Stored JSON doesn't decode
    pub async fn load(&self, id: &CartId) -> DbResult<Option<Cart>> {
        debug!(cart_id = %id, "Loading cart");

        let payload: Option<String> = sqlx::query_scalar("SELECT payload FROM carts WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        payload
            .map(|json| serde_json::from_str::<Cart>(&json).map_err(|e| DbError::corrupt(id.as_str(), e)))
            .transpose()
    }

    /// Inserts or replaces a cart snapshot.
    pub async fn save(&self, cart: &Cart) -> DbResult<()> {
        let payload =
            serde_json::to_string(cart).map_err(|e| DbError::corrupt(cart.id().as_str(), e))?;

        debug!(
            cart_id = %cart.id(),
            items = cart.totals().total_items,
            "Saving cart"
        );

        sqlx::query(
            r#"
            INSERT INTO carts (id, payload, item_count, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                item_count = excluded.item_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(cart.id().as_str())
        .bind(&payload)
        .bind(cart.totals().total_items)
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a cart snapshot. Returns whether a row was removed.
    pub async fn delete(&self, id: &CartId) -> DbResult<bool> {
        debug!(cart_id = %id, "Deleting cart");

        let result = sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of stored carts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
