//! # basket-engine: Cart Controller & External Collaborators
//!
//! Owns the write side of every cart: orders mutations, awaits the coupon
//! service, recomputes totals through `basket-core` and hands committed
//! snapshots to the UI and to persistence.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UI / API ──► CartSessions::open(id) ──► Arc<CartController>           │
//! │                                              │                          │
//! │         add_item / remove_item / update_quantity / clear_cart           │
//! │         apply_coupon (async) / remove_coupon / complete_checkout        │
//! │                                              │                          │
//! │                     ┌────────────────────────┼───────────────────┐     │
//! │                     ▼                        ▼                   ▼     │
//! │             basket_core::LineItemStore  CouponResolver    ShippingRule │
//! │             basket_core::recompute      dyn CouponService              │
//! │                                              │                          │
//! │  CartSessions::close / checkout ──► dyn CartStore                      │
//! │                                      ├── InMemoryCartStore             │
//! │                                      └── SqliteCartStore (basket-db)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`controller`] - Per-cart state machine, stale-response guard
//! - [`coupon`] - Coupon lookups with timeout and response validation
//! - [`service`] - `CouponService` and `CartStore` traits
//! - [`adapters`] - In-memory store and config-driven coupon catalog
//! - [`persistence`] - SQLite-backed `CartStore`
//! - [`sessions`] - Registry of open carts
//! - [`config`] - `EngineConfig` (TOML + `BASKET_*` environment)
//! - [`error`] - Service/config errors and the UI error slot

pub mod adapters;
pub mod config;
pub mod controller;
pub mod coupon;
pub mod error;
pub mod persistence;
pub mod service;
pub mod sessions;

pub use adapters::{CatalogCoupon, CouponCatalog, InMemoryCartStore};
pub use config::EngineConfig;
pub use controller::{CartController, CartPhase, CartState, EngineContext};
pub use coupon::CouponResolver;
pub use error::{ConfigError, ConfigResult, ErrorCode, ErrorDetail, ServiceError, ServiceResult};
pub use persistence::SqliteCartStore;
pub use service::{CartStore, CouponService};
pub use sessions::CartSessions;
