//! # basket-core: Pure Cart & Pricing Logic
//!
//! This crate is the **heart** of the cart engine. It contains the cart data
//! model and every pricing rule as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront UI / API layer                       │   │
//! │  │   addItem, removeItem, updateQuantity, applyCoupon, ...         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              basket-engine (CartController)                     │   │
//! │  │   serializes mutations, awaits the coupon service               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ basket-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  store  │ │ totals  │ │ coupon  │ │shipping │  │   │
//! │  │   │  Cart   │ │LineItem │ │recompute│ │ effects │ │  rules  │  │   │
//! │  │   │CartItem │ │  Store  │ │ Totals  │ │ verdict │ │         │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Cart, CartItem, Totals and identifiers
//! - [`store`] - The ordered line-item store
//! - [`totals`] - The totals calculator
//! - [`coupon`] - Coupon codes, discount effects, service verdicts
//! - [`shipping`] - Shipping rule trait and stock rules
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use basket_core::{recompute, AppliedCoupons, CartLimits, ItemCandidate, LineItemStore, Money};
//! use basket_core::shipping::FreeShipping;
//!
//! let mut store = LineItemStore::new();
//! let candidate = ItemCandidate::new("prod-whey", "Whey Protein", Money::from_cents(1000), 2);
//! store.add(candidate, &CartLimits::default()).unwrap();
//!
//! let totals = recompute(&store, &AppliedCoupons::new(), &FreeShipping).unwrap();
//! assert_eq!(totals.total_items, 2);
//! assert_eq!(totals.total_price.cents(), 2000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod money;
pub mod shipping;
pub mod store;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coupon::{
    AppliedCoupon, AppliedCoupons, CouponCode, CouponRejection, CouponResponse, CouponVerdict,
    DiscountEffect,
};
pub use error::{CartError, CartResult, ExternalService, ValidationError};
pub use money::Money;
pub use shipping::{ShippingError, ShippingRule};
pub use store::LineItemStore;
pub use totals::recompute;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum number of distinct lines in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps checkout payloads reasonable.
/// Overridable through [`CartLimits`].
pub const MAX_CART_LINES: usize = 100;

/// Default maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
