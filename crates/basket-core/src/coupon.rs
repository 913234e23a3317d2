//! # Coupons
//!
//! Coupon codes, discount effects and the closed shape of a coupon service
//! answer.
//!
//! ## Boundary Validation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Coupon Service Response Flow                         │
//! │                                                                         │
//! │  Coupon service (external)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CouponResponse { accepted, discountEffect?, reason? }   (open shape)  │
//! │       │                                                                 │
//! │       ▼  TryFrom ← THIS MODULE                                          │
//! │  CouponVerdict::Accepted { effect }                      (closed shape) │
//! │  CouponVerdict::Rejected { reason }                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AppliedCoupons (inside the Cart)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{normalize_coupon_code, ValidationResult};

// =============================================================================
// Coupon Code
// =============================================================================

/// A normalized coupon code (trimmed, upper-case).
///
/// ## Example
/// ```rust
/// use basket_core::CouponCode;
///
/// let code = CouponCode::parse("  save10 ").unwrap();
/// assert_eq!(code.as_str(), "SAVE10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct CouponCode(String);

impl CouponCode {
    /// Normalizes and validates a raw code.
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        normalize_coupon_code(raw).map(CouponCode)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Discount Effect
// =============================================================================

/// What an accepted coupon takes off the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DiscountEffect {
    /// Percentage off the pre-discount subtotal, in basis points (1000 = 10%).
    Percentage { bps: u32 },
    /// Fixed amount off.
    FixedAmount { amount: Money },
}

impl DiscountEffect {
    /// Discount this effect yields on its own against `subtotal`.
    ///
    /// Each coupon is evaluated against the undiscounted subtotal, never
    /// against the result of another coupon.
    pub fn discount_on(&self, subtotal: Money) -> Money {
        match self {
            DiscountEffect::Percentage { bps } => subtotal.percentage_bps(*bps),
            DiscountEffect::FixedAmount { amount } => *amount,
        }
    }

    /// Checks the effect is something the calculator can apply.
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            DiscountEffect::Percentage { bps } if *bps == 0 || *bps > 10_000 => {
                Err(ValidationError::OutOfRange {
                    field: "discount percentage (bps)".to_string(),
                    min: 1,
                    max: 10_000,
                })
            }
            DiscountEffect::FixedAmount { amount } if !amount.is_positive() => {
                Err(ValidationError::OutOfRange {
                    field: "discount amount".to_string(),
                    min: 1,
                    max: i64::MAX,
                })
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Rejection Reasons
// =============================================================================

/// Why the coupon service turned a coupon down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    Expired,
    NotFound,
    MinimumNotMet,
    AlreadyUsed,
    /// Cannot be combined with the coupons already applied.
    NotStackable,
    /// There is no cart (or no item) to apply it to.
    EmptyCart,
    /// Any reason the service reports that has no dedicated variant.
    Other(String),
}

impl CouponRejection {
    /// Maps a service reason string onto a rejection.
    ///
    /// ## Example
    /// ```rust
    /// use basket_core::CouponRejection;
    ///
    /// assert_eq!(CouponRejection::from_reason("expired"), CouponRejection::Expired);
    /// assert_eq!(CouponRejection::from_reason("MINIMUM_NOT_MET"), CouponRejection::MinimumNotMet);
    /// ```
    pub fn from_reason(reason: &str) -> Self {
        let normalized = reason.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "expired" => CouponRejection::Expired,
            "not_found" | "unknown" | "invalid" => CouponRejection::NotFound,
            "minimum_not_met" | "minimum" => CouponRejection::MinimumNotMet,
            "already_used" | "used" => CouponRejection::AlreadyUsed,
            "not_stackable" | "not_combinable" => CouponRejection::NotStackable,
            "empty_cart" => CouponRejection::EmptyCart,
            _ => CouponRejection::Other(reason.trim().to_string()),
        }
    }
}

impl fmt::Display for CouponRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouponRejection::Expired => write!(f, "coupon has expired"),
            CouponRejection::NotFound => write!(f, "coupon not found"),
            CouponRejection::MinimumNotMet => write!(f, "minimum order value not met"),
            CouponRejection::AlreadyUsed => write!(f, "coupon was already used"),
            CouponRejection::NotStackable => {
                write!(f, "coupon cannot be combined with applied coupons")
            }
            CouponRejection::EmptyCart => write!(f, "cart is empty"),
            CouponRejection::Other(reason) => write!(f, "{}", reason),
        }
    }
}

// =============================================================================
// Service Response
// =============================================================================

/// Raw answer of a coupon service, as it arrives over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponResponse {
    pub accepted: bool,
    #[serde(default)]
    pub discount_effect: Option<DiscountEffect>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Validated answer of a coupon service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponVerdict {
    Accepted { effect: DiscountEffect },
    Rejected { reason: CouponRejection },
}

impl TryFrom<CouponResponse> for CouponVerdict {
    type Error = ValidationError;

    fn try_from(response: CouponResponse) -> Result<Self, Self::Error> {
        if !response.accepted {
            let reason = response
                .reason
                .as_deref()
                .map(CouponRejection::from_reason)
                .unwrap_or(CouponRejection::NotFound);
            return Ok(CouponVerdict::Rejected { reason });
        }

        let effect = response.discount_effect.ok_or_else(|| ValidationError::Required {
            field: "discountEffect".to_string(),
        })?;
        effect.validate()?;
        Ok(CouponVerdict::Accepted { effect })
    }
}

// =============================================================================
// Applied Coupons
// =============================================================================

/// A coupon accepted for a cart, with the effect the service granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub code: CouponCode,
    pub effect: DiscountEffect,
}

/// The set of coupons applied to a cart. Each code appears at most once;
/// application order is preserved.
///
/// Serializes as a bare array; `Cart` declares it to TypeScript as
/// `Array<AppliedCoupon>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppliedCoupons {
    coupons: Vec<AppliedCoupon>,
}

impl AppliedCoupons {
    pub fn new() -> Self {
        AppliedCoupons::default()
    }

    pub fn contains(&self, code: &CouponCode) -> bool {
        self.coupons.iter().any(|c| &c.code == code)
    }

    /// Adds a coupon. Returns false (and changes nothing) if the code is
    /// already applied.
    pub fn insert(&mut self, code: CouponCode, effect: DiscountEffect) -> bool {
        if self.contains(&code) {
            return false;
        }
        self.coupons.push(AppliedCoupon { code, effect });
        true
    }

    /// Removes a coupon. Returns whether it was present.
    pub fn remove(&mut self, code: &CouponCode) -> bool {
        let initial_len = self.coupons.len();
        self.coupons.retain(|c| &c.code != code);
        self.coupons.len() != initial_len
    }

    pub fn codes(&self) -> impl Iterator<Item = &CouponCode> {
        self.coupons.iter().map(|c| &c.code)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AppliedCoupon> {
        self.coupons.iter()
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
