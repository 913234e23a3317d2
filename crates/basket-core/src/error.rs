//! # Error Types
//!
//! Domain-specific error types for basket-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  basket-core errors (this file)                                        │
//! │  ├── CartError        - Cart operation failures (the taxonomy)         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  basket-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  basket-engine errors                                                  │
//! │  ├── ServiceError     - Coupon service / store adapter failures        │
//! │  └── ErrorDetail      - What the UI sees in the error slot             │
//! │                                                                         │
//! │  Flow: ServiceError / DbError → CartError → ErrorDetail → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expected vs. Fatal
//! `CouponRejected` is an expected outcome, not a fault. The controller
//! records it in the error slot and returns `Ok(false)` from `apply_coupon`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::coupon::CouponRejection;
use crate::types::ItemId;

// =============================================================================
// External Service
// =============================================================================

/// The external collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExternalService {
    /// Coupon validation service.
    Coupon,
    /// Shipping rule provider.
    Shipping,
    /// Cart persistence.
    Persistence,
}

impl fmt::Display for ExternalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalService::Coupon => write!(f, "coupon service"),
            ExternalService::Shipping => write!(f, "shipping rule"),
            ExternalService::Persistence => write!(f, "cart store"),
        }
    }
}

// =============================================================================
// Cart Error
// =============================================================================

/// Cart operation errors.
///
/// Every failure of a cart operation is one of these variants. A failed
/// operation never leaves a partially applied cart behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartError {
    /// Line item cannot be found.
    ///
    /// ## When This Occurs
    /// - `update_quantity` on an item id that isn't in the cart
    /// - Item was removed by an earlier operation
    #[error("Cart item not found: {0}")]
    ItemNotFound(ItemId),

    /// Quantity is zero or negative where a positive quantity is required.
    ///
    /// ## When This Occurs
    /// - Adding an item with quantity 0 or less
    /// - Setting a line's quantity to a negative number
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Another mutation (a coupon lookup) is still in flight for this cart.
    ///
    /// ## User Workflow
    /// ```text
    /// applyCoupon("SAVE10") ──► awaiting coupon service ...
    ///      │
    ///      ├── addItem(...)          → OperationInProgress
    ///      ├── applyCoupon("FREE")   → OperationInProgress
    ///      │
    ///      ▼
    /// lookup resolves ──► Ready
    /// ```
    #[error("Another cart operation is in progress")]
    OperationInProgress,

    /// The coupon service rejected a coupon.
    #[error("Coupon {code} rejected: {reason}")]
    CouponRejected { code: String, reason: CouponRejection },

    /// A shipping, coupon or persistence call failed.
    ///
    /// The cart stays at its last good snapshot.
    #[error("{service} unavailable: {message}")]
    ExternalServiceUnavailable {
        service: ExternalService,
        message: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CartError {
    /// Creates an `ExternalServiceUnavailable` error.
    pub fn unavailable(service: ExternalService, message: impl Into<String>) -> Self {
        CartError::ExternalServiceUnavailable {
            service,
            message: message.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid coupon code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CartResult<T> = Result<T, CartError>;

// =============================================================================
// Unit Tests
// =============================================================================
