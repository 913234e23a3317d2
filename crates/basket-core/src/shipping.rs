//! # Shipping Rules
//!
//! The totals calculator asks a [`ShippingRule`] for the shipping cost; the
//! policy itself (flat rates, free-shipping thresholds) lives here or in the
//! caller, never in the calculator.
//!
//! ## Stock Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FreeShipping          always $0.00                                     │
//! │  FlatRate($4.99)       always $4.99                                     │
//! │  ThresholdShipping     $0.00 for an empty cart                          │
//! │    flat: $4.99         $0.00 once total_price ≥ free_over               │
//! │    free_over: $50.00   $4.99 otherwise                                  │
//! │  closure               |price, items| -> Result<Money, ShippingError>   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Failure of a shipping rule provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ShippingError(pub String);

/// Quotes a shipping cost for a cart subtotal and unit count.
pub trait ShippingRule: Send + Sync {
    fn quote(&self, total_price: Money, total_items: i64) -> Result<Money, ShippingError>;
}

impl<F> ShippingRule for F
where
    F: Fn(Money, i64) -> Result<Money, ShippingError> + Send + Sync,
{
    fn quote(&self, total_price: Money, total_items: i64) -> Result<Money, ShippingError> {
        self(total_price, total_items)
    }
}

/// No shipping charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeShipping;

impl ShippingRule for FreeShipping {
    fn quote(&self, _total_price: Money, _total_items: i64) -> Result<Money, ShippingError> {
        Ok(Money::zero())
    }
}

/// The same charge regardless of the cart.
#[derive(Debug, Clone, Copy)]
pub struct FlatRate(pub Money);

impl ShippingRule for FlatRate {
    fn quote(&self, _total_price: Money, _total_items: i64) -> Result<Money, ShippingError> {
        Ok(self.0)
    }
}

/// A flat rate that is waived above a subtotal threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdShipping {
    pub flat_rate: Money,
    /// Subtotal at or above which shipping is free. `None` never waives.
    pub free_over: Option<Money>,
}

impl ShippingRule for ThresholdShipping {
    fn quote(&self, total_price: Money, total_items: i64) -> Result<Money, ShippingError> {
        if total_items == 0 {
            return Ok(Money::zero());
        }
        match self.free_over {
            Some(threshold) if total_price >= threshold => Ok(Money::zero()),
            _ => Ok(self.flat_rate),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_shipping() {
        let rule = ThresholdShipping {
            flat_rate: Money::from_cents(499),
            free_over: Some(Money::from_cents(5000)),
        };

        assert_eq!(rule.quote(Money::zero(), 0).unwrap(), Money::zero());
        assert_eq!(rule.quote(Money::from_cents(4999), 3).unwrap().cents(), 499);
        assert_eq!(rule.quote(Money::from_cents(5000), 3).unwrap(), Money::zero());
    }

    #[test]
    fn test_threshold_without_waiver() {
        let rule = ThresholdShipping {
            flat_rate: Money::from_cents(799),
            free_over: None,
        };
        assert_eq!(rule.quote(Money::from_cents(1_000_000), 1).unwrap().cents(), 799);
    }

    #[test]
    fn test_closure_rule() {
        let per_item = |_price: Money, items: i64| Ok(Money::from_cents(100 * items));
        assert_eq!(per_item.quote(Money::zero(), 3).unwrap().cents(), 300);
    }
}
