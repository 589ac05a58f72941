//! Environment-driven configuration.
//!
//! `main` loads `.env` through `dotenvy` first; everything here reads the
//! process environment only.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::{Money, PricingPolicy};
use crate::{Result, StorefrontError};

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    /// Payment-initiation endpoint of the provider.
    pub gateway_url: String,
    /// Where the provider sends the shopper back to.
    pub callback_url: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    /// Directory for per-session cart files; `None` keeps carts in memory.
    pub cart_storage_dir: Option<PathBuf>,
    /// Most session carts kept open at once.
    pub max_open_carts: usize,
    pub payment: PaymentConfig,
    pub pricing: PricingPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests need not touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = PricingPolicy::default();

        let pricing = PricingPolicy {
            free_shipping_threshold: parse_or(&get, "FREE_SHIPPING_THRESHOLD", defaults.free_shipping_threshold, money)?,
            flat_shipping_fee: parse_or(&get, "FLAT_SHIPPING_FEE", defaults.flat_shipping_fee, money)?,
            tax_rate: parse_or(&get, "TAX_RATE", defaults.tax_rate, rate)?,
            min_transaction_amount: parse_or(&get, "MIN_TRANSACTION_AMOUNT", defaults.min_transaction_amount, money)?,
            coupons: defaults.coupons,
        };

        let port = parse_or(&get, "PORT", 8083, |v| v.parse::<u16>().map_err(|e| e.to_string()))?;
        let max_open_carts = parse_or(&get, "MAX_OPEN_CARTS", 10_000, |v| match v.parse::<usize>() {
            Ok(0) => Err("must be at least 1".to_string()),
            Ok(n) => Ok(n),
            Err(e) => Err(e.to_string()),
        })?;
        let timeout_secs = parse_or(&get, "PAYMENT_TIMEOUT_SECS", 15, |v| v.parse::<u64>().map_err(|e| e.to_string()))?;

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            nats_url: get("NATS_URL"),
            cart_storage_dir: get("CART_STORAGE_DIR").map(PathBuf::from),
            max_open_carts,
            payment: PaymentConfig {
                gateway_url: get("PAYMENT_GATEWAY_URL")
                    .ok_or_else(|| StorefrontError::Config("PAYMENT_GATEWAY_URL is required".into()))?,
                callback_url: get("PAYMENT_CALLBACK_URL")
                    .unwrap_or_else(|| format!("http://localhost:{port}/payment/callback")),
                timeout: Duration::from_secs(timeout_secs),
            },
            pricing,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> std::result::Result<T, String>,
) -> Result<T> {
    match get(key) {
        Some(raw) => parse(raw.trim()).map_err(|e| StorefrontError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

fn money(raw: &str) -> std::result::Result<Money, String> {
    match raw.parse::<i64>() {
        Ok(v) if v >= 0 => Ok(Money::new(v)),
        Ok(v) => Err(format!("must not be negative, got {v}")),
        Err(e) => Err(e.to_string()),
    }
}

fn rate(raw: &str) -> std::result::Result<Decimal, String> {
    let value = Decimal::from_str(raw).map_err(|e| e.to_string())?;
    if value.is_sign_negative() || value > Decimal::ONE {
        return Err(format!("must be between 0 and 1, got {value}"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("PAYMENT_GATEWAY_URL", "https://pay.example/request")]).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.pricing, PricingPolicy::default());
        assert_eq!(cfg.payment.callback_url, "http://localhost:8083/payment/callback");
        assert_eq!(cfg.payment.timeout, Duration::from_secs(15));
        assert!(cfg.database_url.is_none());
        assert!(cfg.cart_storage_dir.is_none());
        assert_eq!(cfg.max_open_carts, 10_000);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PAYMENT_GATEWAY_URL", "https://pay.example/request"),
            ("PORT", "9000"),
            ("TAX_RATE", "0.10"),
            ("FREE_SHIPPING_THRESHOLD", "750000"),
            ("CART_STORAGE_DIR", "/var/lib/carts"),
            ("NATS_URL", "  "),
            ("MAX_OPEN_CARTS", "500"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.pricing.tax_rate, Decimal::new(10, 2));
        assert_eq!(cfg.pricing.free_shipping_threshold, Money::new(750_000));
        assert_eq!(cfg.cart_storage_dir, Some(PathBuf::from("/var/lib/carts")));
        assert!(cfg.nats_url.is_none());
        assert_eq!(cfg.max_open_carts, 500);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(config(&[]), Err(StorefrontError::Config(_))));
        let gateway = ("PAYMENT_GATEWAY_URL", "https://pay.example/request");
        assert!(config(&[gateway, ("TAX_RATE", "1.5")]).is_err());
        assert!(config(&[gateway, ("FLAT_SHIPPING_FEE", "-1")]).is_err());
        assert!(config(&[gateway, ("PORT", "http")]).is_err());
        assert!(config(&[gateway, ("MAX_OPEN_CARTS", "0")]).is_err());
    }
}
