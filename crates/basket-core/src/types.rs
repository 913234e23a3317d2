//! # Domain Types
//!
//! The cart data model.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐        ┌─────────────────────┐                │
//! │  │        Cart         │        │      CartItem       │                │
//! │  │  ─────────────────  │  1..n  │  ─────────────────  │                │
//! │  │  id (CartId)        │───────►│  id (ItemId)        │                │
//! │  │  items (store)      │        │  product_id         │                │
//! │  │  applied_coupons    │        │  price (frozen)     │                │
//! │  │  totals (derived)   │        │  quantity ≥ 1       │                │
//! │  └─────────────────────┘        │  variant?           │                │
//! │                                 │  nutritional_info?  │                │
//! │  ┌─────────────────────┐        └─────────────────────┘                │
//! │  │       Totals        │                                                │
//! │  │  total_items        │   Never set by a mutation.                    │
//! │  │  total_price        │   Always the output of totals::recompute.     │
//! │  │  discount_amount    │                                                │
//! │  │  shipping_cost      │                                                │
//! │  │  final_total        │                                                │
//! │  └─────────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! A line has its own `ItemId` (UUID v4) distinct from the `product_id`, so
//! the same product in two variants forms two lines.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::coupon::{AppliedCoupon, AppliedCoupons};
use crate::error::CartResult;
use crate::money::Money;
use crate::shipping::ShippingRule;
use crate::store::LineItemStore;
use crate::totals::recompute;
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a single cart line (not the product).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generates a fresh UUID v4 item id.
    pub fn generate() -> Self {
        ItemId(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a cart (session- or user-scoped).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct CartId(String);

impl CartId {
    /// Generates a fresh UUID v4 cart id.
    pub fn generate() -> Self {
        CartId(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id (e.g., a session id or user id).
    pub fn new(id: impl Into<String>) -> Self {
        CartId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Variant & Nutrition
// =============================================================================

/// Variant descriptor of a product line (size, flavor).
///
/// Two additions of the same product merge into one line only when their
/// variants are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
}

impl Variant {
    /// Creates a variant from a size and a flavor.
    pub fn new(size: Option<&str>, flavor: Option<&str>) -> Self {
        Variant {
            size: size.map(str::to_string),
            flavor: flavor.map(str::to_string),
        }
    }

    /// A variant with neither size nor flavor describes nothing.
    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.flavor.is_none()
    }
}

/// Nutritional info carried for display. Never used in any calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NutritionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
}

// =============================================================================
// Cart Item
// =============================================================================

/// An item in the shopping cart.
///
/// ## Design Notes
/// - `id`: the line identity, generated when the line is created
/// - `price`: frozen copy of the catalog price at the time of adding.
///   The cart stays stable even if the catalog price changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line id (UUID v4)
    pub id: ItemId,

    /// Product id from the catalog
    pub product_id: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    /// Unit price in cents at time of adding (frozen)
    pub price: Money,

    /// Image reference for display
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Quantity in cart, always ≥ 1
    pub quantity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutritional_info: Option<NutritionInfo>,

    /// When this line was created
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Calculates the line total (unit price × quantity).
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }

    /// Whether this line holds the given product in the given variant.
    pub fn matches(&self, product_id: &str, variant: Option<&Variant>) -> bool {
        self.product_id == product_id && self.variant.as_ref() == variant
    }
}

/// A request to add a product to the cart.
///
/// ## Example
/// ```rust
/// use basket_core::{ItemCandidate, Money, Variant};
///
/// let candidate = ItemCandidate::new("prod-whey", "Whey Protein", Money::from_cents(3999), 1)
///     .with_variant(Variant::new(Some("2lb"), Some("Chocolate")));
/// assert_eq!(candidate.quantity, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemCandidate {
    pub product_id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub variant: Option<Variant>,
    #[serde(default)]
    pub nutritional_info: Option<NutritionInfo>,
}

impl ItemCandidate {
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        quantity: i64,
    ) -> Self {
        ItemCandidate {
            product_id: product_id.into(),
            name: name.into(),
            price,
            image: None,
            quantity,
            variant: None,
            nutritional_info: None,
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_nutrition(mut self, info: NutritionInfo) -> Self {
        self.nutritional_info = Some(info);
        self
    }
}

// =============================================================================
// Limits
// =============================================================================

/// Per-cart limits enforced by the line-item store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLimits {
    /// Maximum number of distinct lines.
    pub max_lines: usize,
    /// Maximum quantity of one line.
    pub max_quantity: i64,
}

impl Default for CartLimits {
    fn default() -> Self {
        CartLimits {
            max_lines: MAX_CART_LINES,
            max_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

// =============================================================================
// Totals
// =============================================================================

/// The totals snapshot of one committed cart state.
///
/// Invariant: `final_total = max(0, total_price - discount_amount) + shipping_cost`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Σ quantity
    pub total_items: i64,
    /// Σ price × quantity, before discount and shipping
    pub total_price: Money,
    /// Coupon discount, capped at `total_price`
    pub discount_amount: Money,
    pub shipping_cost: Money,
    pub final_total: Money,
}

impl Totals {
    /// Totals of a cart with no items and no shipping charge.
    pub fn empty() -> Self {
        Totals::default()
    }

    /// The discounted subtotal (never negative).
    pub fn discounted_subtotal(&self) -> Money {
        self.total_price.saturating_sub(self.discount_amount)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart: items, applied coupons and their derived totals.
///
/// ## Invariants
/// - `totals` is always `recompute(items, applied_coupons, shipping)`; the
///   only constructors run the totals calculator
/// - Items are unique by (product id, variant)
/// - Each coupon code appears at most once
///
/// A `Cart` value is an immutable snapshot. A mutation builds a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: CartId,
    #[ts(as = "Vec<CartItem>")]
    items: LineItemStore,
    #[ts(as = "Vec<AppliedCoupon>")]
    applied_coupons: AppliedCoupons,
    #[serde(flatten)]
    totals: Totals,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
    #[ts(as = "String")]
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new cart snapshot, running the totals calculator.
    pub fn create(
        id: CartId,
        items: LineItemStore,
        applied_coupons: AppliedCoupons,
        shipping: &dyn ShippingRule,
    ) -> CartResult<Self> {
        let totals = recompute(&items, &applied_coupons, shipping)?;
        let now = Utc::now();
        Ok(Cart {
            id,
            items,
            applied_coupons,
            totals,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builds the successor snapshot of this cart with new items and coupons.
    pub fn revise(
        &self,
        items: LineItemStore,
        applied_coupons: AppliedCoupons,
        shipping: &dyn ShippingRule,
    ) -> CartResult<Self> {
        let totals = recompute(&items, &applied_coupons, shipping)?;
        Ok(Cart {
            id: self.id.clone(),
            items,
            applied_coupons,
            totals,
            created_at: self.created_at,
            updated_at: Utc::now(),
        })
    }

    /// Re-checks the lines of a cart that came from outside the engine
    /// (persistence) and recomputes its derived fields, discarding whatever
    /// totals it carried.
    pub fn recomputed(
        mut self,
        shipping: &dyn ShippingRule,
        limits: &CartLimits,
    ) -> CartResult<Self> {
        self.items.check(limits)?;
        self.totals = recompute(&self.items, &self.applied_coupons, shipping)?;
        Ok(self)
    }

    pub fn id(&self) -> &CartId {
        &self.id
    }

    pub fn items(&self) -> &LineItemStore {
        &self.items
    }

    pub fn applied_coupons(&self) -> &AppliedCoupons {
        &self.applied_coupons
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Checks if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CartError;
    use crate::shipping::{FlatRate, FreeShipping};

    fn whey() -> ItemCandidate {
        ItemCandidate::new("prod-whey", "Whey Protein", Money::from_cents(1000), 2)
    }

    #[test]
    fn test_item_ids_are_unique() {
        assert_ne!(ItemId::generate(), ItemId::generate());
    }

    #[test]
    fn test_variant_matching() {
        let mut store = LineItemStore::new();
        let chocolate = Variant::new(Some("2lb"), Some("Chocolate"));
        let id = store
            .add(whey().with_variant(chocolate.clone()), &CartLimits::default())
            .unwrap();

        let item = store.get(&id).unwrap();
        assert!(item.matches("prod-whey", Some(&chocolate)));
        assert!(!item.matches("prod-whey", None));
        assert!(!item.matches("prod-casein", Some(&chocolate)));
    }

    #[test]
    fn test_create_runs_totals() {
        let mut items = LineItemStore::new();
        items.add(whey(), &CartLimits::default()).unwrap();

        let cart = Cart::create(
            CartId::new("session-1"),
            items,
            AppliedCoupons::new(),
            &FlatRate(Money::from_cents(499)),
        )
        .unwrap();

        assert_eq!(cart.totals().total_items, 2);
        assert_eq!(cart.totals().total_price.cents(), 2000);
        assert_eq!(cart.totals().final_total.cents(), 2499);
    }

    #[test]
    fn test_recomputed_discards_stale_totals() {
        let mut items = LineItemStore::new();
        items.add(whey(), &CartLimits::default()).unwrap();
        let cart = Cart::create(CartId::generate(), items, AppliedCoupons::new(), &FreeShipping)
            .unwrap();

        // Tamper with the serialized totals, as a stale persisted copy would
        let mut json = serde_json::to_value(&cart).unwrap();
        json["totalPrice"] = serde_json::json!(1);
        json["finalTotal"] = serde_json::json!(1);
        let stale: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(stale.totals().total_price.cents(), 1);

        let fresh = stale.recomputed(&FreeShipping, &CartLimits::default()).unwrap();
        assert_eq!(fresh.totals(), cart.totals());
    }

    #[test]
    fn test_recomputed_rejects_invalid_lines() {
        let mut items = LineItemStore::new();
        items.add(whey(), &CartLimits::default()).unwrap();
        let cart = Cart::create(CartId::generate(), items, AppliedCoupons::new(), &FreeShipping)
            .unwrap();

        let mut json = serde_json::to_value(&cart).unwrap();
        json["items"][0]["quantity"] = serde_json::json!(-5);
        let stored: Cart = serde_json::from_value(json).unwrap();

        let err = stored
            .recomputed(&FreeShipping, &CartLimits::default())
            .unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity { quantity: -5 });
    }

    #[test]
    fn test_typescript_lists_are_arrays() {
        let decl = Cart::decl();
        assert!(decl.contains("items: Array<CartItem>"), "{decl}");
        assert!(decl.contains("appliedCoupons: Array<AppliedCoupon>"), "{decl}");
    }

    #[test]
    fn test_cart_json_field_names() {
        let mut items = LineItemStore::new();
        items
            .add(
                whey().with_nutrition(NutritionInfo {
                    protein: Some("24g".to_string()),
                    calories: Some(120),
                    serving_size: Some("30g".to_string()),
                }),
                &CartLimits::default(),
            )
            .unwrap();
        let cart = Cart::create(CartId::new("c-1"), items, AppliedCoupons::new(), &FreeShipping)
            .unwrap();

        let json = serde_json::to_value(&cart).unwrap();
        for field in [
            "id",
            "items",
            "appliedCoupons",
            "totalItems",
            "totalPrice",
            "discountAmount",
            "shippingCost",
            "finalTotal",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        let item = &json["items"][0];
        assert_eq!(item["productId"], "prod-whey");
        assert_eq!(item["price"], 1000);
        assert_eq!(item["nutritionalInfo"]["servingSize"], "30g");
    }
}
