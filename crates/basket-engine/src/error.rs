//! # Engine Error Types
//!
//! Adapter failures, configuration failures and the serializable error slot.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Engine                             │
//! │                                                                         │
//! │  CouponService::validate ──► ServiceError ─┐                            │
//! │  CartStore::save/load    ──► ServiceError ─┤                            │
//! │  ShippingRule::quote     ──► ShippingError ┤                            │
//! │                                            ▼                            │
//! │                 CartError::ExternalServiceUnavailable                   │
//! │                                            │                            │
//! │  LineItemStore / validation ─► CartError ──┤                            │
//! │                                            ▼                            │
//! │                 ErrorDetail { code, message }  (CartState error slot)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frontend Shape
//! ```json
//! { "code": "COUPON_REJECTED", "message": "Coupon SAVE10 rejected: coupon has expired" }
//! ```

use std::time::Duration;

use basket_core::{CartError, ExternalService};
use basket_db::DbError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Service Errors
// =============================================================================

/// Result type alias for external collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of an external collaborator (coupon service, cart store).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service could not be reached or failed internally.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within the configured timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The service answered with something that doesn't fit the contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    /// Folds this failure into the cart error taxonomy.
    pub fn into_cart_error(self, service: ExternalService) -> CartError {
        CartError::unavailable(service, self.to_string())
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::CorruptPayload { .. } => ServiceError::InvalidResponse(err.to_string()),
            other => ServiceError::Unavailable(other.to_string()),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// The config file is not valid TOML for [`crate::config::EngineConfig`].
    #[error("Failed to parse config: {0}")]
    ParseFailed(String),

    /// A value is out of range or inconsistent.
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

// =============================================================================
// Error Slot
// =============================================================================

/// Machine-readable error codes for the error slot.
///
/// ## Usage in Frontend
/// ```typescript
/// switch (state.error?.code) {
///   case 'COUPON_REJECTED':
///     showCouponHint(state.error.message);
///     break;
///   case 'OPERATION_IN_PROGRESS':
///     break; // spinner is already showing
///   default:
///     showError(state.error.message);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ItemNotFound,
    InvalidQuantity,
    QuantityTooLarge,
    CartTooLarge,
    OperationInProgress,
    CouponRejected,
    ServiceUnavailable,
    ValidationError,
}

/// The last failure of a cart operation, as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorDetail {
            code,
            message: message.into(),
        }
    }
}

impl From<&CartError> for ErrorDetail {
    fn from(err: &CartError) -> Self {
        let code = match err {
            CartError::ItemNotFound(_) => ErrorCode::ItemNotFound,
            CartError::InvalidQuantity { .. } => ErrorCode::InvalidQuantity,
            CartError::QuantityTooLarge { .. } => ErrorCode::QuantityTooLarge,
            CartError::CartTooLarge { .. } => ErrorCode::CartTooLarge,
            CartError::OperationInProgress => ErrorCode::OperationInProgress,
            CartError::CouponRejected { .. } => ErrorCode::CouponRejected,
            CartError::ExternalServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            CartError::Validation(_) => ErrorCode::ValidationError,
        };
        ErrorDetail::new(code, err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use basket_core::{CouponRejection, ItemId};

    #[test]
    fn test_error_detail_codes() {
        let detail = ErrorDetail::from(&CartError::ItemNotFound(ItemId::new("x")));
        assert_eq!(detail.code, ErrorCode::ItemNotFound);
        assert_eq!(detail.message, "Cart item not found: x");

        let detail = ErrorDetail::from(&CartError::CouponRejected {
            code: "SAVE10".to_string(),
            reason: CouponRejection::Expired,
        });
        assert_eq!(detail.code, ErrorCode::CouponRejected);
        assert_eq!(detail.message, "Coupon SAVE10 rejected: coupon has expired");
    }

    #[test]
    fn test_error_detail_serialization() {
        let detail = ErrorDetail::from(&CartError::OperationInProgress);
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["code"], "OPERATION_IN_PROGRESS");
    }

    #[test]
    fn test_service_error_into_cart_error() {
        let err = ServiceError::Timeout(Duration::from_millis(250))
            .into_cart_error(ExternalService::Coupon);
        assert_eq!(
            err.to_string(),
            "coupon service unavailable: timed out after 250ms"
        );
    }

    #[test]
    fn test_db_error_mapping() {
        let corrupt = ServiceError::from(DbError::corrupt("c1", "eof"));
        assert!(matches!(corrupt, ServiceError::InvalidResponse(_)));

        let closed = ServiceError::from(DbError::PoolExhausted);
        assert!(matches!(closed, ServiceError::Unavailable(_)));
    }
}
