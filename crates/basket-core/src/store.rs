//! # Line-Item Store
//!
//! The ordered collection of cart lines, keyed by [`ItemId`].
//!
//! ## Store Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Line-Item Store Operations                           │
//! │                                                                         │
//! │  add(candidate)          same product + same variant? ──► qty += n      │
//! │                          otherwise ──────────────────────► push line    │
//! │                                                                         │
//! │  remove(item_id)         absent? no-op                                  │
//! │                                                                         │
//! │  set_quantity(id, n)     n == 0 ─► remove                               │
//! │                          n < 0  ─► InvalidQuantity                      │
//! │                          unknown id ─► ItemNotFound                     │
//! │                                                                         │
//! │  clear()                 unconditional                                  │
//! │                                                                         │
//! │  check(limits)           lines read back from storage: same rules as    │
//! │                          add, plus no duplicate ids                     │
//! │                                                                         │
//! │  Every failing call leaves the store exactly as it was.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CartError, CartResult, ValidationError};
use crate::types::{CartItem, CartLimits, ItemCandidate, ItemId};
use crate::validation::{validate_candidate, validate_price, validate_product_id, validate_product_name};

/// Ordered collection of cart lines. Insertion order is preserved.
/// Serializes as a bare array of [`CartItem`].
///
/// ## Invariants
/// - Every line has quantity ≥ 1
/// - No two lines share (product id, variant)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItemStore {
    items: Vec<CartItem>,
}

impl LineItemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        LineItemStore { items: Vec::new() }
    }

    /// Adds a product to the store or increases quantity if already present.
    ///
    /// ## Behavior
    /// - Same product id AND same variant already in store: increases that
    ///   line's quantity
    /// - Otherwise: appends a new line with a fresh item id
    ///
    /// ## Returns
    /// The id of the line that now holds the product.
    pub fn add(&mut self, candidate: ItemCandidate, limits: &CartLimits) -> CartResult<ItemId> {
        validate_candidate(&candidate)?;

        if candidate.quantity <= 0 {
            return Err(CartError::InvalidQuantity {
                quantity: candidate.quantity,
            });
        }

        if candidate.quantity > limits.max_quantity {
            return Err(CartError::QuantityTooLarge {
                requested: candidate.quantity,
                max: limits.max_quantity,
            });
        }

        let variant = candidate.variant.filter(|v| !v.is_empty());

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.matches(&candidate.product_id, variant.as_ref()))
        {
            let new_qty = item
                .quantity
                .checked_add(candidate.quantity)
                .filter(|q| *q <= limits.max_quantity)
                .ok_or(CartError::QuantityTooLarge {
                    requested: item.quantity.saturating_add(candidate.quantity),
                    max: limits.max_quantity,
                })?;
            item.quantity = new_qty;
            return Ok(item.id.clone());
        }

        if self.items.len() >= limits.max_lines {
            return Err(CartError::CartTooLarge {
                max: limits.max_lines,
            });
        }

        let id = ItemId::generate();
        self.items.push(CartItem {
            id: id.clone(),
            product_id: candidate.product_id,
            name: candidate.name,
            price: candidate.price,
            image: candidate.image,
            quantity: candidate.quantity,
            variant,
            nutritional_info: candidate.nutritional_info,
            added_at: Utc::now(),
        });
        Ok(id)
    }

    /// Removes a line. Returns whether a line was removed.
    pub fn remove(&mut self, item_id: &ItemId) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| &i.id != item_id);
        self.items.len() != initial_len
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// - Quantity 0: removes the line
    /// - Negative quantity: `InvalidQuantity`
    /// - Quantity above the limit: `QuantityTooLarge`
    /// - Unknown id: `ItemNotFound`
    pub fn set_quantity(
        &mut self,
        item_id: &ItemId,
        quantity: i64,
        limits: &CartLimits,
    ) -> CartResult<()> {
        if quantity < 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        if !self.contains(item_id) {
            return Err(CartError::ItemNotFound(item_id.clone()));
        }

        if quantity == 0 {
            self.remove(item_id);
            return Ok(());
        }

        if quantity > limits.max_quantity {
            return Err(CartError::QuantityTooLarge {
                requested: quantity,
                max: limits.max_quantity,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|i| &i.id == item_id) {
            item.quantity = quantity;
        }
        Ok(())
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Re-checks lines that did not arrive through [`add`](Self::add), such as
    /// a snapshot decoded from storage.
    ///
    /// ## Rejects
    /// - Bad product id, name or price: `Validation`
    /// - Quantity below 1: `InvalidQuantity`
    /// - Quantity above the limit: `QuantityTooLarge`
    /// - More lines than the limit: `CartTooLarge`
    /// - Repeated item id or repeated (product id, variant): `Validation`
    pub fn check(&self, limits: &CartLimits) -> CartResult<()> {
        if self.items.len() > limits.max_lines {
            return Err(CartError::CartTooLarge {
                max: limits.max_lines,
            });
        }

        for (index, item) in self.items.iter().enumerate() {
            validate_product_id(&item.product_id)?;
            validate_product_name(&item.name)?;
            validate_price(item.price)?;

            if item.quantity <= 0 {
                return Err(CartError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            if item.quantity > limits.max_quantity {
                return Err(CartError::QuantityTooLarge {
                    requested: item.quantity,
                    max: limits.max_quantity,
                });
            }

            let earlier = &self.items[..index];
            if earlier.iter().any(|other| other.id == item.id) {
                return Err(duplicate_line(format!("item id {} appears twice", item.id)));
            }
            if earlier
                .iter()
                .any(|other| other.matches(&item.product_id, item.variant.as_ref()))
            {
                return Err(duplicate_line(format!(
                    "product {} appears on two lines with the same variant",
                    item.product_id
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| &i.id == item_id)
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.get(item_id).is_some()
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates lines in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[CartItem] {
        &self.items
    }
}

fn duplicate_line(reason: String) -> CartError {
    CartError::Validation(ValidationError::InvalidFormat {
        field: "items".to_string(),
        reason,
    })
}

impl<'a> IntoIterator for &'a LineItemStore {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::Variant;

    fn candidate(product_id: &str, price_cents: i64, qty: i64) -> ItemCandidate {
        ItemCandidate::new(
            product_id,
            format!("Product {}", product_id),
            Money::from_cents(price_cents),
            qty,
        )
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();

        let first = store.add(candidate("A", 1000, 2), &limits).unwrap();
        let second = store.add(candidate("A", 1000, 1), &limits).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&first).unwrap().quantity, 3);
    }

    #[test]
    fn test_add_different_variant_forms_new_line() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();

        let vanilla = store
            .add(
                candidate("A", 1000, 1).with_variant(Variant::new(None, Some("Vanilla"))),
                &limits,
            )
            .unwrap();
        let chocolate = store
            .add(
                candidate("A", 1000, 1).with_variant(Variant::new(None, Some("Chocolate"))),
                &limits,
            )
            .unwrap();

        assert_ne!(vanilla, chocolate);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_empty_variant_is_no_variant() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();

        let plain = store.add(candidate("A", 500, 1), &limits).unwrap();
        let empty = store
            .add(candidate("A", 500, 1).with_variant(Variant::default()), &limits)
            .unwrap();

        assert_eq!(plain, empty);
        assert_eq!(store.get(&plain).unwrap().quantity, 2);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();
        for id in ["C", "A", "B"] {
            store.add(candidate(id, 100, 1), &limits).unwrap();
        }
        store.add(candidate("A", 100, 4), &limits).unwrap();

        let order: Vec<&str> = store.iter().map(|i| i.product_id.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut store = LineItemStore::new();
        let err = store
            .add(candidate("A", 100, 0), &CartLimits::default())
            .unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity { quantity: 0 });
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_rejects_negative_price() {
        let mut store = LineItemStore::new();
        let err = store
            .add(candidate("A", -1, 1), &CartLimits::default())
            .unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
    }

    #[test]
    fn test_merge_over_limit_leaves_line_untouched() {
        let mut store = LineItemStore::new();
        let limits = CartLimits {
            max_lines: 10,
            max_quantity: 5,
        };
        let id = store.add(candidate("A", 100, 4), &limits).unwrap();

        let err = store.add(candidate("A", 100, 2), &limits).unwrap_err();
        assert_eq!(err, CartError::QuantityTooLarge { requested: 6, max: 5 });
        assert_eq!(store.get(&id).unwrap().quantity, 4);
    }

    #[test]
    fn test_merge_overflow_is_rejected() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();
        let id = store.add(candidate("A", 100, 1), &limits).unwrap();

        let err = store.add(candidate("A", 100, i64::MAX), &limits).unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityTooLarge {
                requested: i64::MAX,
                max: limits.max_quantity,
            }
        );
        assert_eq!(store.get(&id).unwrap().quantity, 1);

        // Raise the limit so only the addition itself can overflow
        let unbounded = CartLimits {
            max_lines: 10,
            max_quantity: i64::MAX,
        };
        let err = store.add(candidate("A", 100, i64::MAX), &unbounded).unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityTooLarge {
                requested: i64::MAX,
                max: i64::MAX,
            }
        );
        assert_eq!(store.get(&id).unwrap().quantity, 1);
    }

    #[test]
    fn test_check_accepts_store_built_by_add() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();
        store.add(candidate("A", 100, 3), &limits).unwrap();
        store
            .add(candidate("A", 100, 1).with_variant(Variant::new(Some("5lb"), None)), &limits)
            .unwrap();
        store.add(candidate("B", 0, 1), &limits).unwrap();

        assert_eq!(store.check(&limits), Ok(()));
    }

    #[test]
    fn test_check_rejects_bad_lines() {
        let limits = CartLimits {
            max_lines: 2,
            max_quantity: 10,
        };
        let mut store = LineItemStore::new();
        let id = store.add(candidate("A", 100, 1), &limits).unwrap();

        let mut negative = store.clone();
        negative.items[0].quantity = -5;
        assert_eq!(
            negative.check(&limits),
            Err(CartError::InvalidQuantity { quantity: -5 })
        );

        let mut huge = store.clone();
        huge.items[0].quantity = 11;
        assert_eq!(
            huge.check(&limits),
            Err(CartError::QuantityTooLarge { requested: 11, max: 10 })
        );

        let mut underpriced = store.clone();
        underpriced.items[0].price = Money::from_cents(-100);
        assert!(matches!(
            underpriced.check(&limits),
            Err(CartError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut doubled = store.clone();
        let mut copy = doubled.items[0].clone();
        copy.id = ItemId::generate();
        doubled.items.push(copy);
        assert!(matches!(
            doubled.check(&limits),
            Err(CartError::Validation(ValidationError::InvalidFormat { .. }))
        ));

        let mut same_id = store.clone();
        same_id.add(candidate("B", 100, 1), &limits).unwrap();
        same_id.items[1].id = id;
        assert!(matches!(
            same_id.check(&limits),
            Err(CartError::Validation(ValidationError::InvalidFormat { .. }))
        ));

        let mut crowded = store.clone();
        crowded.add(candidate("B", 100, 1), &limits).unwrap();
        let mut extra = crowded.items[0].clone();
        extra.id = ItemId::generate();
        extra.product_id = "C".to_string();
        crowded.items.push(extra);
        assert_eq!(crowded.check(&limits), Err(CartError::CartTooLarge { max: 2 }));
    }

    #[test]
    fn test_line_limit() {
        let mut store = LineItemStore::new();
        let limits = CartLimits {
            max_lines: 2,
            max_quantity: 999,
        };
        store.add(candidate("A", 100, 1), &limits).unwrap();
        store.add(candidate("B", 100, 1), &limits).unwrap();

        let err = store.add(candidate("C", 100, 1), &limits).unwrap_err();
        assert_eq!(err, CartError::CartTooLarge { max: 2 });
        // Merging into an existing line is still fine at the limit
        store.add(candidate("A", 100, 1), &limits).unwrap();
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = LineItemStore::new();
        let id = store
            .add(candidate("A", 100, 1), &CartLimits::default())
            .unwrap();

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(!store.remove(&ItemId::new("never-existed")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_quantity() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();
        let id = store.add(candidate("A", 100, 1), &limits).unwrap();

        store.set_quantity(&id, 7, &limits).unwrap();
        assert_eq!(store.get(&id).unwrap().quantity, 7);

        let err = store.set_quantity(&id, -1, &limits).unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity { quantity: -1 });
        assert_eq!(store.get(&id).unwrap().quantity, 7);

        store.set_quantity(&id, 0, &limits).unwrap();
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_set_quantity_unknown_item() {
        let mut store = LineItemStore::new();
        let missing = ItemId::new("missing");
        let err = store
            .set_quantity(&missing, 2, &CartLimits::default())
            .unwrap_err();
        assert_eq!(err, CartError::ItemNotFound(missing));
    }

    #[test]
    fn test_clear() {
        let mut store = LineItemStore::new();
        let limits = CartLimits::default();
        store.add(candidate("A", 100, 1), &limits).unwrap();
        store.add(candidate("B", 100, 1), &limits).unwrap();

        store.clear();
        assert!(store.is_empty());
    }
}
