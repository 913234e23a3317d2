//! # basket-db: Cart Persistence
//!
//! Keeps committed cart snapshots in SQLite between sessions.
//!
//! ```text
//! basket-engine (CartSessions)
//!        │ load / save / delete, at open, close and checkout only
//!        ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Database (pool.rs) ── carts() ──► CartRepository (cart.rs)   │
//! │      │                                   │                   │
//! │      └── migrations.rs                   └── JSON payload    │
//! │           001_carts.sql                      per cart row    │
//! └──────────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//!   basket.db (WAL) or sqlite::memory:
//! ```
//!
//! Stored totals are never trusted: the engine recomputes them on restore.
//!
//! ## Usage
//! ```rust,ignore
//! use basket_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::file("./basket.db")).await?;
//! let cart = db.carts().load(&cart_id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use migrations::SchemaStatus;
pub use pool::{Database, DbConfig, DbLocation};
pub use repository::cart::CartRepository;
