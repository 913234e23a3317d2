//! # Repository Module
//!
//! Database repositories for Basket.
//!
//! ```text
//! CartSessions ──► db.carts().save(&cart) ──► CartRepository ──► SQLite
//! ```
//!
//! ## Available Repositories
//!
//! - [`cart::CartRepository`] - Cart snapshot load/save/delete

pub mod cart;
