//! # In-Process Adapters
//!
//! Implementations of the collaborator traits that need no network.
//!
//! - [`InMemoryCartStore`] - `CartStore` backed by a map (tests, replay runs
//!   without a database)
//! - [`CouponCatalog`] - `CouponService` backed by the `[coupons]` section of
//!   the engine config
//!
//! ## Catalog Rules (checked in order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  unknown code                          → not_found                      │
//! │  expires_at < now                      → expired                        │
//! │  single_use and already redeemed       → already_used                   │
//! │  total_price < min_order               → minimum_not_met                │
//! │  cart has coupons and either side is                                   │
//! │    not stackable                       → not_stackable                  │
//! │  otherwise                             → accepted { effect }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use basket_core::{Cart, CartId, CouponCode, CouponResponse, DiscountEffect, Money, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::service::{CartStore, CouponService};

// =============================================================================
// In-Memory Cart Store
// =============================================================================

/// `CartStore` that keeps carts in a map.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<CartId, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        InMemoryCartStore::default()
    }

    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.carts.read().await.is_empty()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, id: &CartId) -> ServiceResult<Option<Cart>> {
        Ok(self.carts.read().await.get(id).cloned())
    }

    async fn save(&self, cart: &Cart) -> ServiceResult<()> {
        self.carts
            .write()
            .await
            .insert(cart.id().clone(), cart.clone());
        Ok(())
    }

    async fn delete(&self, id: &CartId) -> ServiceResult<()> {
        self.carts.write().await.remove(id);
        Ok(())
    }
}

// =============================================================================
// Coupon Catalog
// =============================================================================

/// One coupon definition.
///
/// ## TOML
/// ```toml
/// [[coupons.catalog]]
/// code = "SAVE10"
/// effect = { type = "fixedAmount", amount = 300 }
/// min_order = 2000
/// stackable = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCoupon {
    pub code: String,

    pub effect: DiscountEffect,

    /// Minimum pre-discount subtotal, in cents.
    #[serde(default)]
    pub min_order: Option<Money>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Can be redeemed by one order only.
    #[serde(default)]
    pub single_use: bool,

    /// Can be combined with other coupons.
    #[serde(default = "default_stackable")]
    pub stackable: bool,
}

fn default_stackable() -> bool {
    true
}

impl CatalogCoupon {
    /// A stackable coupon with no restrictions.
    pub fn new(code: impl Into<String>, effect: DiscountEffect) -> Self {
        CatalogCoupon {
            code: code.into(),
            effect,
            min_order: None,
            expires_at: None,
            single_use: false,
            stackable: true,
        }
    }
}

/// `CouponService` over a fixed set of coupon definitions.
#[derive(Debug, Default)]
pub struct CouponCatalog {
    coupons: HashMap<CouponCode, CatalogCoupon>,
    redeemed: Mutex<HashSet<CouponCode>>,
}

impl CouponCatalog {
    /// Builds a catalog, normalizing codes and checking every effect.
    ///
    /// ## Errors
    /// - Invalid code or effect
    /// - The same code defined twice (after normalization)
    pub fn new(entries: impl IntoIterator<Item = CatalogCoupon>) -> Result<Self, ValidationError> {
        let mut coupons = HashMap::new();
        for entry in entries {
            let code = CouponCode::parse(&entry.code)?;
            entry.effect.validate()?;
            if coupons.contains_key(&code) {
                return Err(ValidationError::InvalidFormat {
                    field: "coupon catalog".to_string(),
                    reason: format!("duplicate code {}", code),
                });
            }
            coupons.insert(code, entry);
        }
        Ok(CouponCatalog {
            coupons,
            redeemed: Mutex::new(HashSet::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }

    fn is_redeemed(&self, code: &CouponCode) -> bool {
        self.redeemed
            .lock()
            .map(|set| set.contains(code))
            .unwrap_or(false)
    }

    fn verdict(&self, code: &CouponCode, cart: &Cart, now: DateTime<Utc>) -> CouponResponse {
        let Some(coupon) = self.coupons.get(code) else {
            return rejected("not_found");
        };

        if coupon.expires_at.is_some_and(|at| at < now) {
            return rejected("expired");
        }

        if coupon.single_use && self.is_redeemed(code) {
            return rejected("already_used");
        }

        if coupon
            .min_order
            .is_some_and(|min| cart.totals().total_price < min)
        {
            return rejected("minimum_not_met");
        }

        let applied = cart.applied_coupons();
        if !applied.is_empty() {
            let others_stack = applied
                .codes()
                .all(|c| self.coupons.get(c).map_or(true, |other| other.stackable));
            if !coupon.stackable || !others_stack {
                return rejected("not_stackable");
            }
        }

        CouponResponse {
            accepted: true,
            discount_effect: Some(coupon.effect),
            reason: None,
        }
    }
}

fn rejected(reason: &str) -> CouponResponse {
    CouponResponse {
        accepted: false,
        discount_effect: None,
        reason: Some(reason.to_string()),
    }
}

#[async_trait]
impl CouponService for CouponCatalog {
    async fn validate(&self, code: &CouponCode, cart: &Cart) -> ServiceResult<CouponResponse> {
        let response = self.verdict(code, cart, Utc::now());
        debug!(code = %code, accepted = response.accepted, "Catalog coupon verdict");
        Ok(response)
    }

    async fn redeem(&self, codes: &[CouponCode]) -> ServiceResult<()> {
        let mut redeemed = self
            .redeemed
            .lock()
            .map_err(|_| ServiceError::Unavailable("redemption ledger poisoned".to_string()))?;
        for code in codes {
            if self.coupons.get(code).is_some_and(|c| c.single_use) {
                redeemed.insert(code.clone());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
