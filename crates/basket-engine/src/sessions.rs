//! # Cart Sessions
//!
//! Registry of open carts. Each open cart has exactly one
//! [`CartController`]; callers share it as `Arc<CartController>`.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  open(id) ──► already open? ──► same controller                         │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  store.load(id) ──► Some(cart) ──► CartController::restore (recompute)  │
//! │     │                                                                   │
//! │     └───────────► None ───────► CartController::new (Empty)             │
//! │                                                                         │
//! │  ... mutations through the controller, no store traffic ...             │
//! │                                                                         │
//! │  close(id) ──► cart exists? save : delete ──► forget controller         │
//! │                                                                         │
//! │  checkout(id) ──► prepare_checkout ──► store.delete                     │
//! │                   ──► complete_checkout ──► forget ──► redeem coupons   │
//! │                                                                         │
//! │  A failed store call leaves the session open with its cart intact.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A coupon lookup still in flight when a session closes is not persisted;
//! only the committed snapshot is saved.

use std::collections::HashMap;
use std::sync::Arc;

use basket_core::{Cart, CartId, CartResult, ExternalService};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::controller::{CartController, EngineContext};
use crate::service::CartStore;

/// Owned registry of per-cart controllers.
pub struct CartSessions {
    context: EngineContext,
    store: Arc<dyn CartStore>,
    open: RwLock<HashMap<CartId, Arc<CartController>>>,
}

impl std::fmt::Debug for CartSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSessions")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl CartSessions {
    pub fn new(context: EngineContext, store: Arc<dyn CartStore>) -> Self {
        CartSessions {
            context,
            store,
            open: RwLock::new(HashMap::new()),
        }
    }

    /// Opens a session, loading the stored cart if there is one.
    ///
    /// The registry is not locked while the store loads. When two callers
    /// open the same id at once, the first to register wins and both get
    /// its controller.
    pub async fn open(&self, id: &CartId) -> CartResult<Arc<CartController>> {
        if let Some(controller) = self.get(id).await {
            return Ok(controller);
        }

        let stored = self
            .store
            .load(id)
            .await
            .map_err(|e| e.into_cart_error(ExternalService::Persistence))?;

        let controller = match stored {
            Some(cart) => {
                info!(cart_id = %id, items = cart.items().len(), "Restoring cart session");
                CartController::restore(cart, self.context.clone())?
            }
            None => {
                info!(cart_id = %id, "Opening new cart session");
                CartController::new(id.clone(), self.context.clone())
            }
        };

        let mut open = self.open.write().await;
        let controller = open
            .entry(id.clone())
            .or_insert_with(|| Arc::new(controller));
        Ok(Arc::clone(controller))
    }

    /// The controller of an open session.
    pub async fn get(&self, id: &CartId) -> Option<Arc<CartController>> {
        self.open.read().await.get(id).cloned()
    }

    /// Writes the committed snapshot of an open session without closing it.
    pub async fn persist(&self, id: &CartId) -> CartResult<()> {
        let Some(controller) = self.get(id).await else {
            return Ok(());
        };
        self.write_through(id, controller.cart()).await
    }

    /// Persists and forgets a session. Closing an unknown id is a no-op.
    ///
    /// The session stays open if the store write fails.
    pub async fn close(&self, id: &CartId) -> CartResult<()> {
        let Some(controller) = self.get(id).await else {
            return Ok(());
        };
        info!(cart_id = %id, "Closing cart session");
        self.write_through(id, controller.cart()).await?;
        self.open.write().await.remove(id);
        Ok(())
    }

    /// Completes checkout: deletes the stored copy, returns the final cart
    /// and reports its coupons as redeemed.
    ///
    /// The live cart is destroyed only after the store delete succeeds.
    pub async fn checkout(&self, id: &CartId) -> CartResult<Arc<Cart>> {
        let controller = self.open(id).await?;
        controller.prepare_checkout()?;

        self.write_through(id, None).await?;
        let order = controller.complete_checkout()?;

        info!(
            cart_id = %id,
            final_total = %order.totals().final_total,
            "Checkout completed"
        );
        self.open.write().await.remove(id);

        let codes: Vec<_> = order.applied_coupons().codes().cloned().collect();
        if let Err(err) = self.context.coupons.redeem(&codes).await {
            warn!(cart_id = %id, error = %err, "Coupon redemption failed after checkout");
        }

        Ok(order)
    }

    /// Closes every open session.
    pub async fn close_all(&self) -> CartResult<()> {
        let ids: Vec<CartId> = self.open.read().await.keys().cloned().collect();
        for id in ids {
            self.close(&id).await?;
        }
        Ok(())
    }

    pub async fn open_count(&self) -> usize {
        self.open.read().await.len()
    }

    async fn write_through(&self, id: &CartId, cart: Option<Arc<Cart>>) -> CartResult<()> {
        let result = match cart {
            Some(cart) => self.store.save(&cart).await,
            None => self.store.delete(id).await,
        };
        result.map_err(|e| {
            warn!(cart_id = %id, error = %e, "Cart store write failed");
            e.into_cart_error(ExternalService::Persistence)
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
