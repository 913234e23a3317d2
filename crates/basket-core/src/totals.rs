//! # Totals Calculator
//!
//! `recompute(items, applied_coupons, shipping_rule) -> Totals`
//!
//! ## Steps (fixed order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. total_items = Σ quantity                                            │
//! │     total_price = Σ price × quantity   (frozen add-time prices)         │
//! │                                                                         │
//! │  2. discount_amount = min(total_price, Σ effect(total_price))           │
//! │     every coupon sees the undiscounted total_price: additive,           │
//! │     never multiplicative                                                │
//! │                                                                         │
//! │  3. shipping_cost = shipping_rule.quote(total_price, total_items)       │
//! │                                                                         │
//! │  4. final_total = max(0, total_price − discount_amount) + shipping_cost │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deterministic and side-effect free: the same inputs always yield the
//! same [`Totals`].

use crate::coupon::AppliedCoupons;
use crate::error::{CartError, CartResult, ExternalService};
use crate::money::Money;
use crate::shipping::ShippingRule;
use crate::store::LineItemStore;
use crate::types::Totals;

/// Recomputes the derived totals of a cart.
///
/// ## Errors
/// `ExternalServiceUnavailable` (shipping) if the shipping rule fails or
/// quotes a negative cost.
///
/// ## Example
/// ```rust
/// use basket_core::{recompute, AppliedCoupons, CartLimits, CouponCode, DiscountEffect};
/// use basket_core::{ItemCandidate, LineItemStore, Money};
/// use basket_core::shipping::FlatRate;
///
/// let mut items = LineItemStore::new();
/// items.add(ItemCandidate::new("A", "Bar", Money::from_cents(1000), 3), &CartLimits::default()).unwrap();
///
/// let mut coupons = AppliedCoupons::new();
/// coupons.insert(
///     CouponCode::parse("SAVE10").unwrap(),
///     DiscountEffect::FixedAmount { amount: Money::from_cents(300) },
/// );
///
/// let totals = recompute(&items, &coupons, &FlatRate(Money::from_cents(500))).unwrap();
/// assert_eq!(totals.total_price.cents(), 3000);
/// assert_eq!(totals.discount_amount.cents(), 300);
/// assert_eq!(totals.final_total.cents(), 3200);
/// ```
pub fn recompute(
    items: &LineItemStore,
    applied_coupons: &AppliedCoupons,
    shipping: &dyn ShippingRule,
) -> CartResult<Totals> {
    // Step 1: quantities and line totals
    let total_items: i64 = items.iter().map(|i| i.quantity).sum();
    let total_price: Money = items.iter().map(|i| i.line_total()).sum();

    // Step 2: independent, additive, capped
    let discount_amount = resolve_discount(total_price, applied_coupons);

    // Step 3: external policy
    let shipping_cost = shipping
        .quote(total_price, total_items)
        .map_err(|e| CartError::unavailable(ExternalService::Shipping, e.to_string()))?;
    if shipping_cost.is_negative() {
        return Err(CartError::unavailable(
            ExternalService::Shipping,
            format!("negative shipping quote {}", shipping_cost),
        ));
    }

    // Step 4
    let final_total = total_price.saturating_sub(discount_amount) + shipping_cost;

    Ok(Totals {
        total_items,
        total_price,
        discount_amount,
        shipping_cost,
        final_total,
    })
}

/// Folds every applied coupon over the subtotal.
fn resolve_discount(total_price: Money, applied_coupons: &AppliedCoupons) -> Money {
    let uncapped: Money = applied_coupons
        .iter()
        .map(|c| c.effect.discount_on(total_price))
        .sum();
    uncapped.min(total_price).max(Money::zero())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::{CouponCode, DiscountEffect};
    use crate::shipping::{FlatRate, FreeShipping, ShippingError, ThresholdShipping};
    use crate::types::{CartLimits, ItemCandidate};

    fn store(lines: &[(&str, i64, i64)]) -> LineItemStore {
        let mut store = LineItemStore::new();
        for (product, price, qty) in lines {
            store
                .add(
                    ItemCandidate::new(*product, *product, Money::from_cents(*price), *qty),
                    &CartLimits::default(),
                )
                .unwrap();
        }
        store
    }

    fn coupons(effects: &[(&str, DiscountEffect)]) -> AppliedCoupons {
        let mut coupons = AppliedCoupons::new();
        for (code, effect) in effects {
            coupons.insert(CouponCode::parse(code).unwrap(), *effect);
        }
        coupons
    }

    fn fixed(cents: i64) -> DiscountEffect {
        DiscountEffect::FixedAmount {
            amount: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_empty_cart() {
        let totals = recompute(&LineItemStore::new(), &AppliedCoupons::new(), &FreeShipping)
            .unwrap();
        assert_eq!(totals, Totals::empty());
    }

    #[test]
    fn test_sums_lines() {
        let items = store(&[("A", 1000, 2), ("B", 299, 3)]);
        let totals = recompute(&items, &AppliedCoupons::new(), &FreeShipping).unwrap();

        assert_eq!(totals.total_items, 5);
        assert_eq!(totals.total_price.cents(), 2000 + 897);
        assert_eq!(totals.final_total, totals.total_price);
    }

    #[test]
    fn test_coupons_are_additive_not_compounding() {
        let items = store(&[("A", 10_000, 1)]);
        let ten_percent = DiscountEffect::Percentage { bps: 1000 };
        let twenty_percent = DiscountEffect::Percentage { bps: 2000 };
        let applied = coupons(&[("TEN", ten_percent), ("TWENTY", twenty_percent)]);

        let totals = recompute(&items, &applied, &FreeShipping).unwrap();
        // 10% + 20% of $100.00 = $30.00 (compounding would give $28.00)
        assert_eq!(totals.discount_amount.cents(), 3000);
        assert_eq!(totals.final_total.cents(), 7000);
    }

    #[test]
    fn test_discount_capped_at_total_price() {
        let items = store(&[("A", 500, 1)]);
        let applied = coupons(&[("BIG", fixed(400)), ("BIGGER", fixed(400))]);

        let totals = recompute(&items, &applied, &FlatRate(Money::from_cents(499))).unwrap();
        assert_eq!(totals.discount_amount.cents(), 500);
        // Subtotal floors at zero, shipping still applies
        assert_eq!(totals.final_total.cents(), 499);
    }

    #[test]
    fn test_coupon_on_empty_items_yields_no_discount() {
        let applied = coupons(&[("SAVE10", fixed(300))]);
        let totals = recompute(&LineItemStore::new(), &applied, &FreeShipping).unwrap();
        assert!(totals.discount_amount.is_zero());
        assert!(totals.final_total.is_zero());
    }

    #[test]
    fn test_shipping_threshold_uses_pre_discount_price() {
        let items = store(&[("A", 5000, 1)]);
        let rule = ThresholdShipping {
            flat_rate: Money::from_cents(499),
            free_over: Some(Money::from_cents(5000)),
        };
        let applied = coupons(&[("SAVE10", fixed(1000))]);

        let totals = recompute(&items, &applied, &rule).unwrap();
        assert!(totals.shipping_cost.is_zero());
        assert_eq!(totals.final_total.cents(), 4000);
    }

    #[test]
    fn test_shipping_failure_surfaces_as_unavailable() {
        let items = store(&[("A", 100, 1)]);
        let failing =
            |_: Money, _: i64| -> Result<Money, ShippingError> { Err(ShippingError("no quote".into())) };

        let err = recompute(&items, &AppliedCoupons::new(), &failing).unwrap_err();
        assert_eq!(
            err,
            CartError::unavailable(ExternalService::Shipping, "no quote")
        );
    }

    #[test]
    fn test_negative_shipping_quote_rejected() {
        let items = store(&[("A", 100, 1)]);
        let negative = FlatRate(Money::from_cents(-1));
        let err = recompute(&items, &AppliedCoupons::new(), &negative).unwrap_err();
        assert!(matches!(
            err,
            CartError::ExternalServiceUnavailable {
                service: ExternalService::Shipping,
                ..
            }
        ));
    }

    #[test]
    fn test_deterministic() {
        let items = store(&[("A", 1234, 3), ("B", 99, 7)]);
        let applied = coupons(&[("P", DiscountEffect::Percentage { bps: 1250 })]);
        let rule = FlatRate(Money::from_cents(350));

        let first = recompute(&items, &applied, &rule).unwrap();
        let second = recompute(&items, &applied, &rule).unwrap();
        assert_eq!(first, second);
    }
}

// =============================================================================
// Property Tests
// =============================================================================
