//! # SQLite Cart Store
//!
//! Binds the [`CartStore`] seam to [`basket_db::CartRepository`].

use async_trait::async_trait;
use basket_core::{Cart, CartId};
use basket_db::{CartRepository, Database};

use crate::error::ServiceResult;
use crate::service::CartStore;

/// `CartStore` backed by the SQLite `carts` table.
#[derive(Debug, Clone)]
pub struct SqliteCartStore {
    repo: CartRepository,
}

impl SqliteCartStore {
    pub fn new(db: &Database) -> Self {
        SqliteCartStore { repo: db.carts() }
    }
}

#[async_trait]
impl CartStore for SqliteCartStore {
    async fn load(&self, id: &CartId) -> ServiceResult<Option<Cart>> {
        Ok(self.repo.load(id).await?)
    }

    async fn save(&self, cart: &Cart) -> ServiceResult<()> {
        Ok(self.repo.save(cart).await?)
    }

    async fn delete(&self, id: &CartId) -> ServiceResult<()> {
        self.repo.delete(id).await?;
        Ok(())
    }
}
