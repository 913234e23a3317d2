//! # Cart Controller
//!
//! The only writer of a cart. Every mutation goes through here.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────┐  add_item   ┌───────┐  apply_coupon   ┌──────────┐         │
//! │   │ Empty │ ──────────► │ Ready │ ──────────────► │ Mutating │         │
//! │   └───────┘             └───────┘ ◄────────────── └──────────┘         │
//! │       ▲                  │  ▲  │   lookup resolves   │    │            │
//! │       │   clear_cart /   │  │  │   (accepted, or     │    │            │
//! │       │   checkout       │  └──┘   rejected with     │    │            │
//! │       └──────────────────┘  add / remove / update /  │    │            │
//! │       ▲                     remove_coupon            │    │            │
//! │       │                                              │    │            │
//! │       └──────────── clear_cart (supersedes) ─────────┘    │            │
//! │                     remove_coupon (supersedes) ───► Ready ┘            │
//! │                                                                         │
//! │   While Mutating: add_item, remove_item, update_quantity and           │
//! │   apply_coupon fail with OperationInProgress.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Commit Protocol
//! ```text
//! lock ─► copy items + coupons ─► mutate the copy ─► recompute totals
//!      ─► replace Arc<Cart> ─► seq += 1 ─► clear error slot ─► unlock
//! ```
//! A failing step leaves the committed snapshot untouched and records the
//! failure in the error slot.
//!
//! ## Stale-Response Guard
//! `apply_coupon` records the sequence number it started under as the
//! in-flight lookup and releases the lock while the coupon service runs. The
//! verdict is committed only if that number is still the in-flight one when
//! the lookup resolves. `clear_cart` and `remove_coupon` reset the in-flight
//! slot, so a late verdict is discarded. Dropping the apply future releases
//! the slot as well.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use basket_core::{
    AppliedCoupons, Cart, CartError, CartId, CartLimits, CartResult, CouponCode, CouponRejection,
    CouponVerdict, ItemCandidate, ItemId, LineItemStore, ShippingRule, Totals, ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::coupon::CouponResolver;
use crate::error::ErrorDetail;

// =============================================================================
// Engine Context
// =============================================================================

/// Collaborators shared by every controller of an engine.
#[derive(Clone)]
pub struct EngineContext {
    pub coupons: CouponResolver,
    pub shipping: Arc<dyn ShippingRule>,
    pub limits: CartLimits,
}

impl EngineContext {
    pub fn new(coupons: CouponResolver, shipping: Arc<dyn ShippingRule>, limits: CartLimits) -> Self {
        EngineContext {
            coupons,
            shipping,
            limits,
        }
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("coupons", &self.coupons)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Observable State
// =============================================================================

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum CartPhase {
    /// No cart yet.
    Empty,
    /// Cart exists and its totals are consistent.
    Ready,
    /// A coupon lookup is in flight.
    Mutating,
}

/// What the UI observes: the committed cart plus the last failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    #[ts(as = "Option<Cart>")]
    pub cart: Option<Arc<Cart>>,
    /// True only while a coupon lookup is outstanding.
    pub is_loading: bool,
    pub phase: CartPhase,
    pub error: Option<ErrorDetail>,
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug, Default)]
struct Inner {
    cart: Option<Arc<Cart>>,
    /// Advanced by every committed mutation and every supersede.
    seq: u64,
    /// Sequence number of the outstanding coupon lookup.
    in_flight: Option<u64>,
    error: Option<ErrorDetail>,
}

impl Inner {
    fn phase(&self) -> CartPhase {
        match (&self.cart, self.in_flight) {
            (_, Some(_)) => CartPhase::Mutating,
            (Some(_), None) => CartPhase::Ready,
            (None, None) => CartPhase::Empty,
        }
    }

    fn ensure_idle(&self) -> CartResult<()> {
        match self.in_flight {
            Some(_) => Err(CartError::OperationInProgress),
            None => Ok(()),
        }
    }

    fn commit(&mut self, cart: Cart) {
        self.cart = Some(Arc::new(cart));
        self.seq += 1;
    }

    /// Drops any outstanding lookup so its verdict is discarded.
    fn supersede(&mut self) {
        if let Some(seq) = self.in_flight.take() {
            debug!(superseded_seq = seq, "Superseding coupon lookup");
        }
        self.seq += 1;
    }

    /// Current items and coupons, ready to be mutated as a copy.
    fn working_copy(&self) -> (LineItemStore, AppliedCoupons) {
        match &self.cart {
            Some(cart) => (cart.items().clone(), cart.applied_coupons().clone()),
            None => (LineItemStore::new(), AppliedCoupons::new()),
        }
    }

    /// The snapshot a checkout would hand out right now.
    fn order(&self) -> CartResult<Arc<Cart>> {
        self.ensure_idle()?;
        match &self.cart {
            Some(cart) if !cart.is_empty() => Ok(Arc::clone(cart)),
            _ => Err(CartError::Validation(ValidationError::Required {
                field: "cart items".to_string(),
            })),
        }
    }

    /// Updates the error slot from an operation result.
    fn record<T>(&mut self, result: CartResult<T>) -> CartResult<T> {
        match &result {
            Ok(_) => self.error = None,
            Err(err) => {
                debug!(error = %err, "Cart operation failed");
                self.error = Some(ErrorDetail::from(err));
            }
        }
        result
    }
}

/// Serializes the mutations of one cart.
///
/// ## Usage
/// ```rust,ignore
/// let controller = CartController::new(CartId::generate(), context);
/// let line = controller.add_item(ItemCandidate::new("A", "Whey", Money::from_cents(1000), 2))?;
/// let accepted = controller.apply_coupon("save10").await?;
/// let totals = controller.calculate_totals();
/// ```
#[derive(Debug)]
pub struct CartController {
    cart_id: CartId,
    context: EngineContext,
    inner: Mutex<Inner>,
}

impl CartController {
    /// Creates a controller with no cart yet.
    pub fn new(cart_id: CartId, context: EngineContext) -> Self {
        CartController {
            cart_id,
            context,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Creates a controller around a cart that came from persistence. Its
    /// lines are re-checked against the engine limits and its totals are
    /// recomputed before it becomes visible.
    pub fn restore(cart: Cart, context: EngineContext) -> CartResult<Self> {
        let cart = cart.recomputed(context.shipping.as_ref(), &context.limits)?;
        let controller = CartController::new(cart.id().clone(), context);
        controller.lock().commit(cart);
        Ok(controller)
    }

    pub fn cart_id(&self) -> &CartId {
        &self.cart_id
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds the next snapshot from mutated items and coupons.
    fn next_snapshot(
        &self,
        current: Option<&Arc<Cart>>,
        items: LineItemStore,
        coupons: AppliedCoupons,
    ) -> CartResult<Cart> {
        let shipping = self.context.shipping.as_ref();
        match current {
            Some(cart) => cart.revise(items, coupons, shipping),
            None => Cart::create(self.cart_id.clone(), items, coupons, shipping),
        }
    }

    // =========================================================================
    // Line Items
    // =========================================================================

    /// Adds a product, merging into an existing line with the same product
    /// and variant. Creates the cart on first use.
    pub fn add_item(&self, candidate: ItemCandidate) -> CartResult<ItemId> {
        let mut inner = self.lock();
        debug!(cart_id = %self.cart_id, product_id = %candidate.product_id, quantity = candidate.quantity, seq = inner.seq, "add_item");

        let result = inner.ensure_idle().and_then(|()| {
            let (mut items, coupons) = inner.working_copy();
            let item_id = items.add(candidate, &self.context.limits)?;
            let next = self.next_snapshot(inner.cart.as_ref(), items, coupons)?;
            Ok((item_id, next))
        });

        let result = result.map(|(item_id, next)| {
            inner.commit(next);
            item_id
        });
        inner.record(result)
    }

    /// Removes a line. Unknown ids are a no-op.
    pub fn remove_item(&self, item_id: &ItemId) -> CartResult<()> {
        let mut inner = self.lock();
        debug!(cart_id = %self.cart_id, item_id = %item_id, seq = inner.seq, "remove_item");

        let result = inner.ensure_idle().and_then(|()| {
            let (mut items, coupons) = inner.working_copy();
            if !items.remove(item_id) {
                return Ok(None);
            }
            self.next_snapshot(inner.cart.as_ref(), items, coupons).map(Some)
        });

        let result = result.map(|next| {
            if let Some(next) = next {
                inner.commit(next);
            }
        });
        inner.record(result)
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&self, item_id: &ItemId, quantity: i64) -> CartResult<()> {
        let mut inner = self.lock();
        debug!(cart_id = %self.cart_id, item_id = %item_id, quantity, seq = inner.seq, "update_quantity");

        let result = inner.ensure_idle().and_then(|()| {
            if inner.cart.is_none() {
                return Err(CartError::ItemNotFound(item_id.clone()));
            }
            let (mut items, coupons) = inner.working_copy();
            items.set_quantity(item_id, quantity, &self.context.limits)?;
            self.next_snapshot(inner.cart.as_ref(), items, coupons)
        });

        let result = result.map(|next| inner.commit(next));
        inner.record(result)
    }

    /// Destroys the cart. Supersedes an outstanding coupon lookup.
    pub fn clear_cart(&self) -> CartResult<()> {
        let mut inner = self.lock();
        debug!(cart_id = %self.cart_id, seq = inner.seq, "clear_cart");

        inner.supersede();
        inner.cart = None;
        inner.record(Ok(()))
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Applies a coupon code.
    ///
    /// ## Returns
    /// * `Ok(true)` - Accepted and committed
    /// * `Ok(false)` - Already applied, rejected by the service (reason in
    ///   the error slot), no cart to apply it to, or superseded while the
    ///   lookup was in flight
    /// * `Err(OperationInProgress)` - Another lookup is in flight
    /// * `Err(ExternalServiceUnavailable)` - The coupon service failed
    pub async fn apply_coupon(&self, raw_code: &str) -> CartResult<bool> {
        let (code, snapshot, seq) = {
            let mut inner = self.lock();
            debug!(cart_id = %self.cart_id, code = %raw_code, seq = inner.seq, "apply_coupon");

            let code = match inner.ensure_idle().and_then(|()| Ok(CouponCode::parse(raw_code)?)) {
                Ok(code) => code,
                Err(err) => return inner.record(Err(err)),
            };

            let Some(snapshot) = inner.cart.clone().filter(|cart| !cart.is_empty()) else {
                warn!(cart_id = %self.cart_id, code = %code, "Coupon applied to an empty cart");
                let rejected = CartError::CouponRejected {
                    code: code.to_string(),
                    reason: CouponRejection::EmptyCart,
                };
                let _ = inner.record::<()>(Err(rejected));
                return Ok(false);
            };

            if snapshot.applied_coupons().contains(&code) {
                debug!(cart_id = %self.cart_id, code = %code, "Coupon already applied");
                return Ok(false);
            }

            inner.seq += 1;
            let seq = inner.seq;
            inner.in_flight = Some(seq);
            (code, snapshot, seq)
        };

        let guard = InFlightGuard {
            controller: self,
            seq,
            armed: true,
        };

        let verdict = self.context.coupons.lookup(&code, &snapshot).await;

        let mut inner = self.lock();
        guard.disarm();

        if inner.in_flight != Some(seq) {
            warn!(cart_id = %self.cart_id, code = %code, seq, "Discarding stale coupon verdict");
            return Ok(false);
        }
        inner.in_flight = None;

        match verdict {
            Err(err) => inner.record(Err(err)),
            Ok(CouponVerdict::Rejected { reason }) => {
                warn!(cart_id = %self.cart_id, code = %code, reason = %reason, "Coupon rejected");
                let rejected = CartError::CouponRejected {
                    code: code.to_string(),
                    reason,
                };
                let _ = inner.record::<()>(Err(rejected));
                Ok(false)
            }
            Ok(CouponVerdict::Accepted { effect }) => {
                let (items, mut coupons) = inner.working_copy();
                coupons.insert(code, effect);
                let result = self
                    .next_snapshot(inner.cart.as_ref(), items, coupons)
                    .map(|next| {
                        inner.commit(next);
                        true
                    });
                inner.record(result)
            }
        }
    }

    /// Removes a coupon code. Idempotent; supersedes an outstanding lookup.
    pub fn remove_coupon(&self, raw_code: &str) -> CartResult<()> {
        let mut inner = self.lock();
        debug!(cart_id = %self.cart_id, code = %raw_code, seq = inner.seq, "remove_coupon");

        let code = match CouponCode::parse(raw_code) {
            Ok(code) => code,
            Err(err) => return inner.record(Err(err.into())),
        };

        inner.supersede();

        let result = match &inner.cart {
            Some(cart) if cart.applied_coupons().contains(&code) => {
                let (items, mut coupons) = inner.working_copy();
                coupons.remove(&code);
                self.next_snapshot(inner.cart.as_ref(), items, coupons).map(Some)
            }
            _ => Ok(None),
        };

        let result = result.map(|next| {
            if let Some(next) = next {
                inner.commit(next);
            }
        });
        inner.record(result)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Totals of the committed snapshot; zero totals when there is no cart.
    pub fn calculate_totals(&self) -> Totals {
        self.lock()
            .cart
            .as_ref()
            .map(|cart| *cart.totals())
            .unwrap_or_else(Totals::empty)
    }

    /// The committed snapshot, if a cart exists.
    pub fn cart(&self) -> Option<Arc<Cart>> {
        self.lock().cart.clone()
    }

    pub fn state(&self) -> CartState {
        let inner = self.lock();
        CartState {
            cart: inner.cart.clone(),
            is_loading: inner.in_flight.is_some(),
            phase: inner.phase(),
            error: inner.error.clone(),
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Checks that the cart could be checked out now without destroying it.
    /// A failure lands in the error slot; success leaves the slot alone.
    pub fn prepare_checkout(&self) -> CartResult<Arc<Cart>> {
        let mut inner = self.lock();
        match inner.order() {
            Ok(order) => Ok(order),
            Err(err) => inner.record(Err(err)),
        }
    }

    /// Hands out the final snapshot and destroys the cart.
    pub fn complete_checkout(&self) -> CartResult<Arc<Cart>> {
        let mut inner = self.lock();
        debug!(cart_id = %self.cart_id, seq = inner.seq, "complete_checkout");

        let result = inner.order();
        if result.is_ok() {
            inner.cart = None;
            inner.seq += 1;
        }
        inner.record(result)
    }
}

/// Releases the in-flight slot if an `apply_coupon` future is dropped
/// before its lookup resolves.
struct InFlightGuard<'a> {
    controller: &'a CartController,
    seq: u64,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.controller.lock();
        if inner.in_flight == Some(self.seq) {
            debug!(cart_id = %self.controller.cart_id, seq = self.seq, "Coupon lookup dropped");
            inner.in_flight = None;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
