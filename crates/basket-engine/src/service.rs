//! # External Collaborators
//!
//! The async seams between the engine and the outside world.
//!
//! ```text
//! ┌──────────────────┐  validate(code, cart)   ┌──────────────────────────┐
//! │  CouponResolver  │ ──────────────────────► │ dyn CouponService        │
//! └──────────────────┘                         │  CouponCatalog (config)  │
//!                                              │  remote adapter, mocks   │
//!                                              └──────────────────────────┘
//! ┌──────────────────┐  load / save / delete   ┌──────────────────────────┐
//! │  CartSessions    │ ──────────────────────► │ dyn CartStore            │
//! └──────────────────┘                         │  InMemoryCartStore       │
//!                                              │  SqliteCartStore         │
//!                                              └──────────────────────────┘
//! ```
//!
//! Shipping is synchronous and lives in [`basket_core::shipping`].

use async_trait::async_trait;
use basket_core::{Cart, CartId, CouponCode, CouponResponse};

use crate::error::ServiceResult;

/// Validates coupon codes for a cart.
#[async_trait]
pub trait CouponService: Send + Sync {
    /// Asks whether `code` applies to `cart`. The answer is the raw wire
    /// shape; the engine validates it before it touches a cart.
    async fn validate(&self, code: &CouponCode, cart: &Cart) -> ServiceResult<CouponResponse>;

    /// Marks coupons as used once an order completes.
    async fn redeem(&self, _codes: &[CouponCode]) -> ServiceResult<()> {
        Ok(())
    }
}

/// Persists committed carts between sessions.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, id: &CartId) -> ServiceResult<Option<Cart>>;

    async fn save(&self, cart: &Cart) -> ServiceResult<()>;

    /// Removes a stored cart. Deleting an unknown id is not an error.
    async fn delete(&self, id: &CartId) -> ServiceResult<()>;
}
