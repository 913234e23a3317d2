//! # Validation
//!
//! Field checks that run before anything touches a cart.
//!
//! ```text
//! ItemCandidate ──► validate_candidate ──► LineItemStore::add
//!                   (product id, name, price)   (quantity, limits)
//!
//! raw coupon code ──► normalize_coupon_code ──► CouponCode
//!                     (trim, upper-case, charset, length)
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::ItemCandidate;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest coupon code the engine will send to the coupon service.
pub const MAX_COUPON_CODE_LEN: usize = 32;

pub const MAX_PRODUCT_ID_LEN: usize = 100;
pub const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Trimmed `value` must be non-empty and at most `max` bytes.
fn bounded_text<'a>(field: &str, value: &'a str, max: usize) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value)
}

pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    bounded_text("productId", product_id, MAX_PRODUCT_ID_LEN).map(|_| ())
}

/// ```rust
/// use basket_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Whey Protein 2lb").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    bounded_text("name", name, MAX_PRODUCT_NAME_LEN).map(|_| ())
}

/// Unit prices may be zero (free samples) but never negative.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Checks the descriptive fields of an item about to be added.
///
/// Quantity is left to the line-item store, which reports it as
/// `InvalidQuantity` rather than a validation error.
pub fn validate_candidate(candidate: &ItemCandidate) -> ValidationResult<()> {
    validate_product_id(&candidate.product_id)?;
    validate_product_name(&candidate.name)?;
    validate_price(candidate.price)
}

/// Normalizes a coupon code: trim, then ASCII upper-case.
///
/// ```rust
/// use basket_core::validation::normalize_coupon_code;
///
/// assert_eq!(normalize_coupon_code(" save10\n").unwrap(), "SAVE10");
/// assert!(normalize_coupon_code("   ").is_err());
/// assert!(normalize_coupon_code("SAVE 10").is_err());
/// ```
pub fn normalize_coupon_code(raw: &str) -> ValidationResult<String> {
    let code = bounded_text("coupon code", raw, MAX_COUPON_CODE_LEN)?.to_ascii_uppercase();

    if let Some(bad) = code
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon code".to_string(),
            reason: format!("unexpected character {:?}", bad),
        });
    }

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_fields() {
        assert!(validate_product_id("prod-whey-2lb").is_ok());
        assert!(validate_product_id("   ").is_err());
        assert_eq!(
            validate_product_id(&"p".repeat(101)),
            Err(ValidationError::TooLong {
                field: "productId".to_string(),
                max: MAX_PRODUCT_ID_LEN,
            })
        );
        assert!(validate_product_name("Casein Night Blend").is_ok());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_candidate() {
        let ok = ItemCandidate::new("A", "Bar", Money::zero(), 1);
        assert!(validate_candidate(&ok).is_ok());

        let negative = ItemCandidate::new("A", "Bar", Money::from_cents(-1), 1);
        assert!(matches!(
            validate_candidate(&negative),
            Err(ValidationError::OutOfRange { .. })
        ));

        let unnamed = ItemCandidate::new("A", "", Money::zero(), 1);
        assert!(matches!(
            validate_candidate(&unnamed),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_normalize_coupon_code() {
        assert_eq!(normalize_coupon_code("save10").unwrap(), "SAVE10");
        assert_eq!(normalize_coupon_code("  Spring_25-off ").unwrap(), "SPRING_25-OFF");

        assert!(normalize_coupon_code("").is_err());
        assert!(normalize_coupon_code("ÉTÉ").is_err());
        assert!(normalize_coupon_code(&"X".repeat(33)).is_err());
        assert!(normalize_coupon_code(&"X".repeat(32)).is_ok());
    }
}
