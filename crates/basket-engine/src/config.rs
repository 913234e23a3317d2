//! # Engine Configuration
//!
//! Limits, shipping, coupons and storage for a cart engine.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`BASKET_*`)
//! 2. Config file (`BASKET_CONFIG`, or `engine.toml` in the platform config dir)
//! 3. Defaults (this file)
//!
//! ## Example Config File
//! ```toml
//! [limits]
//! max_lines = 100
//! max_quantity = 999
//!
//! [shipping]
//! flat_rate = 499
//! free_over = 5000
//!
//! [coupons]
//! timeout_ms = 5000
//!
//! [[coupons.catalog]]
//! code = "SAVE10"
//! effect = { type = "fixedAmount", amount = 300 }
//!
//! [database]
//! path = "/var/lib/basket/basket.db"
//! ```
//!
//! ## Environment Variables
//! ```text
//! BASKET_CONFIG               config file path
//! BASKET_DB_PATH              SQLite file (":memory:" for an in-memory database)
//! BASKET_MAX_LINES            limits.max_lines
//! BASKET_MAX_QUANTITY         limits.max_quantity
//! BASKET_SHIPPING_FLAT_CENTS  shipping.flat_rate
//! BASKET_FREE_SHIPPING_CENTS  shipping.free_over ("none" disables the waiver)
//! BASKET_COUPON_TIMEOUT_MS    coupons.timeout_ms
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use basket_core::shipping::ThresholdShipping;
use basket_core::{CartLimits, Money, MAX_CART_LINES, MAX_ITEM_QUANTITY};
use basket_db::DbConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::{CatalogCoupon, CouponCatalog};
use crate::coupon::CouponResolver;
use crate::controller::EngineContext;
use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Sections
// =============================================================================

/// `[limits]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsSettings {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,

    #[serde(default = "default_max_quantity")]
    pub max_quantity: i64,
}

fn default_max_lines() -> usize {
    MAX_CART_LINES
}

fn default_max_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}

impl Default for LimitsSettings {
    fn default() -> Self {
        LimitsSettings {
            max_lines: default_max_lines(),
            max_quantity: default_max_quantity(),
        }
    }
}

/// `[shipping]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSettings {
    /// Flat shipping charge, in cents.
    #[serde(default = "default_flat_rate")]
    pub flat_rate: Money,

    /// Subtotal (cents) at or above which shipping is free.
    #[serde(default = "default_free_over")]
    pub free_over: Option<Money>,
}

fn default_flat_rate() -> Money {
    Money::from_cents(499)
}

fn default_free_over() -> Option<Money> {
    Some(Money::from_cents(5000))
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            flat_rate: default_flat_rate(),
            free_over: default_free_over(),
        }
    }
}

/// `[coupons]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponSettings {
    /// Coupon service timeout (milliseconds).
    #[serde(default = "default_coupon_timeout")]
    pub timeout_ms: u64,

    /// Coupons served by the in-process catalog.
    #[serde(default)]
    pub catalog: Vec<CatalogCoupon>,
}

fn default_coupon_timeout() -> u64 {
    5000
}

impl Default for CouponSettings {
    fn default() -> Self {
        CouponSettings {
            timeout_ms: default_coupon_timeout(),
            catalog: Vec::new(),
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. No path keeps carts in process memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub limits: LimitsSettings,

    #[serde(default)]
    pub shipping: ShippingSettings,

    #[serde(default)]
    pub coupons: CouponSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl EngineConfig {
    /// Loads configuration: file, then environment, then validation.
    ///
    /// `config_path` wins over `BASKET_CONFIG`, which wins over the
    /// platform default. A missing file means defaults.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("BASKET_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                config = Self::from_toml(&std::fs::read_to_string(&path)?)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.limits.max_lines == 0 {
            return Err(ConfigError::Invalid("limits.max_lines must be greater than 0".into()));
        }

        if self.limits.max_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "limits.max_quantity must be greater than 0".into(),
            ));
        }

        if self.shipping.flat_rate.is_negative() {
            return Err(ConfigError::Invalid("shipping.flat_rate must not be negative".into()));
        }

        if self.shipping.free_over.is_some_and(|m| m.is_negative()) {
            return Err(ConfigError::Invalid("shipping.free_over must not be negative".into()));
        }

        if self.coupons.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "coupons.timeout_ms must be greater than 0".into(),
            ));
        }

        CouponCatalog::new(self.coupons.catalog.iter().cloned())
            .map_err(|e| ConfigError::Invalid(format!("coupons.catalog: {}", e)))?;

        Ok(())
    }

    /// Applies `BASKET_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BASKET_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(v) = parse_var(&lookup, "BASKET_MAX_LINES") {
            self.limits.max_lines = v;
        }

        if let Some(v) = parse_var(&lookup, "BASKET_MAX_QUANTITY") {
            self.limits.max_quantity = v;
        }

        if let Some(v) = parse_var(&lookup, "BASKET_SHIPPING_FLAT_CENTS") {
            self.shipping.flat_rate = Money::from_cents(v);
        }

        if let Some(raw) = lookup("BASKET_FREE_SHIPPING_CENTS") {
            match raw.trim() {
                "" | "none" => self.shipping.free_over = None,
                value => match value.parse::<i64>() {
                    Ok(cents) => self.shipping.free_over = Some(Money::from_cents(cents)),
                    Err(_) => warn!(value = %raw, "Ignoring invalid BASKET_FREE_SHIPPING_CENTS"),
                },
            }
        }

        if let Some(v) = parse_var(&lookup, "BASKET_COUPON_TIMEOUT_MS") {
            self.coupons.timeout_ms = v;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "basket", "engine")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Derived Values
    // =========================================================================

    pub fn limits(&self) -> CartLimits {
        CartLimits {
            max_lines: self.limits.max_lines,
            max_quantity: self.limits.max_quantity,
        }
    }

    pub fn shipping_rule(&self) -> ThresholdShipping {
        ThresholdShipping {
            flat_rate: self.shipping.flat_rate,
            free_over: self.shipping.free_over,
        }
    }

    pub fn coupon_timeout(&self) -> Duration {
        Duration::from_millis(self.coupons.timeout_ms)
    }

    /// Database configuration, if carts should live in SQLite.
    pub fn database_config(&self) -> Option<DbConfig> {
        self.database.path.as_ref().map(|path| {
            if path.as_os_str() == ":memory:" {
                DbConfig::in_memory()
            } else {
                DbConfig::file(path)
            }
        })
    }

    /// Engine context with the catalog as coupon service.
    pub fn context(&self) -> ConfigResult<EngineContext> {
        let catalog = CouponCatalog::new(self.coupons.catalog.iter().cloned())
            .map_err(|e| ConfigError::Invalid(format!("coupons.catalog: {}", e)))?;

        Ok(EngineContext::new(
            CouponResolver::new(Arc::new(catalog), self.coupon_timeout()),
            Arc::new(self.shipping_rule()),
            self.limits(),
        ))
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!(key, value = %raw, "Overriding config from environment");
            Some(value)
        }
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use basket_core::DiscountEffect;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits(), CartLimits::default());
        assert_eq!(config.coupon_timeout(), Duration::from_secs(5));
        assert!(config.database_config().is_none());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml(
            r#"
            [shipping]
            flat_rate = 799

            [[coupons.catalog]]
            code = "save10"
            effect = { type = "percentage", bps = 1000 }
            "#,
        )
        .unwrap();

        assert_eq!(config.shipping.flat_rate.cents(), 799);
        assert_eq!(config.shipping.free_over, Some(Money::from_cents(5000)));
        assert_eq!(config.limits.max_lines, MAX_CART_LINES);
        assert_eq!(
            config.coupons.catalog[0].effect,
            DiscountEffect::Percentage { bps: 1000 }
        );
        assert!(config.context().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(env(&[
            ("BASKET_MAX_LINES", "10"),
            ("BASKET_MAX_QUANTITY", "abc"),
            ("BASKET_SHIPPING_FLAT_CENTS", "0"),
            ("BASKET_FREE_SHIPPING_CENTS", "none"),
            ("BASKET_COUPON_TIMEOUT_MS", "250"),
            ("BASKET_DB_PATH", ":memory:"),
        ]));

        assert_eq!(config.limits.max_lines, 10);
        assert_eq!(config.limits.max_quantity, MAX_ITEM_QUANTITY);
        assert!(config.shipping.flat_rate.is_zero());
        assert_eq!(config.shipping.free_over, None);
        assert_eq!(config.coupon_timeout(), Duration::from_millis(250));
        assert!(config.database_config().unwrap().is_in_memory());
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.limits.max_lines = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.coupons.catalog = vec![
            CatalogCoupon::new("A", DiscountEffect::Percentage { bps: 500 }),
            CatalogCoupon::new("a", DiscountEffect::Percentage { bps: 500 }),
        ];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml("[limits]\nmax_lines = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }
}
