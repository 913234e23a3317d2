//! # Coupon Resolver
//!
//! Turns a coupon code into a validated verdict by asking the coupon service.
//!
//! ## Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lookup(code, cart)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tokio::time::timeout(timeout, service.validate(code, cart))            │
//! │       │                                                                 │
//! │       ├── elapsed ─────────────► ServiceError::Timeout                  │
//! │       ├── Err(ServiceError) ───► as is                                  │
//! │       ▼                                                                 │
//! │  CouponVerdict::try_from(response)                                      │
//! │       ├── malformed ───────────► ServiceError::InvalidResponse          │
//! │       ▼                                                                 │
//! │  Accepted { effect } | Rejected { reason }                              │
//! │                                                                         │
//! │  every ServiceError ──► CartError::ExternalServiceUnavailable(coupon)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver never mutates a cart. Deduplication, the in-flight guard and
//! committing an accepted coupon belong to [`crate::controller::CartController`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use basket_core::{Cart, CartResult, CouponCode, CouponVerdict, ExternalService};
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::service::CouponService;

/// Default time a coupon lookup may take.
pub const DEFAULT_COUPON_TIMEOUT: Duration = Duration::from_secs(5);

/// Coupon service handle with a lookup timeout.
#[derive(Clone)]
pub struct CouponResolver {
    service: Arc<dyn CouponService>,
    timeout: Duration,
}

impl fmt::Debug for CouponResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouponResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CouponResolver {
    pub fn new(service: Arc<dyn CouponService>, timeout: Duration) -> Self {
        CouponResolver { service, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Asks the coupon service about `code` for `cart`.
    pub async fn lookup(&self, code: &CouponCode, cart: &Cart) -> CartResult<CouponVerdict> {
        debug!(cart_id = %cart.id(), code = %code, "Validating coupon");

        let response = match tokio::time::timeout(self.timeout, self.service.validate(code, cart)).await {
            Err(_) => Err(ServiceError::Timeout(self.timeout)),
            Ok(result) => result,
        };

        let verdict = response.and_then(|raw| {
            CouponVerdict::try_from(raw).map_err(|e| ServiceError::InvalidResponse(e.to_string()))
        });

        verdict.map_err(|e| {
            warn!(cart_id = %cart.id(), code = %code, error = %e, "Coupon service call failed");
            e.into_cart_error(ExternalService::Coupon)
        })
    }

    /// Reports coupons of a completed order to the coupon service.
    pub async fn redeem(&self, codes: &[CouponCode]) -> CartResult<()> {
        if codes.is_empty() {
            return Ok(());
        }
        self.service
            .redeem(codes)
            .await
            .map_err(|e| e.into_cart_error(ExternalService::Coupon))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceResult;
    use async_trait::async_trait;
    use basket_core::shipping::FreeShipping;
    use basket_core::{
        AppliedCoupons, CartError, CartId, CouponRejection, CouponResponse, DiscountEffect,
        LineItemStore, Money,
    };

    struct Fixed(ServiceResult<CouponResponse>);

    #[async_trait]
    impl CouponService for Fixed {
        async fn validate(&self, _code: &CouponCode, _cart: &Cart) -> ServiceResult<CouponResponse> {
            self.0.clone()
        }
    }

    struct Stalled;

    #[async_trait]
    impl CouponService for Stalled {
        async fn validate(&self, _code: &CouponCode, _cart: &Cart) -> ServiceResult<CouponResponse> {
            std::future::pending().await
        }
    }

    fn cart() -> Cart {
        Cart::create(
            CartId::new("c1"),
            LineItemStore::new(),
            AppliedCoupons::new(),
            &FreeShipping,
        )
        .unwrap()
    }

    fn code() -> CouponCode {
        CouponCode::parse("SAVE10").unwrap()
    }

    fn resolver(service: impl CouponService + 'static) -> CouponResolver {
        CouponResolver::new(Arc::new(service), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_accepted() {
        let r = resolver(Fixed(Ok(CouponResponse {
            accepted: true,
            discount_effect: Some(DiscountEffect::FixedAmount {
                amount: Money::from_cents(300),
            }),
            reason: None,
        })));

        let verdict = r.lookup(&code(), &cart()).await.unwrap();
        assert!(matches!(verdict, CouponVerdict::Accepted { .. }));
    }

    #[tokio::test]
    async fn test_rejected() {
        let r = resolver(Fixed(Ok(CouponResponse {
            accepted: false,
            discount_effect: None,
            reason: Some("expired".to_string()),
        })));

        let verdict = r.lookup(&code(), &cart()).await.unwrap();
        assert_eq!(
            verdict,
            CouponVerdict::Rejected {
                reason: CouponRejection::Expired
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_response_is_unavailable() {
        let r = resolver(Fixed(Ok(CouponResponse {
            accepted: true,
            discount_effect: Some(DiscountEffect::Percentage { bps: 20_000 }),
            reason: None,
        })));

        let err = r.lookup(&code(), &cart()).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::ExternalServiceUnavailable {
                service: ExternalService::Coupon,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_service_error_is_unavailable() {
        let r = resolver(Fixed(Err(ServiceError::Unavailable("503".to_string()))));
        let err = r.lookup(&code(), &cart()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "coupon service unavailable: service unavailable: 503"
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let r = resolver(Stalled);
        let err = r.lookup(&code(), &cart()).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 50ms"));
    }
}
