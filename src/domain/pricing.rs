//! Cart pricing: shipping threshold, tax, coupon discount.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::value_objects::Money;

/// Coupon code recognized by exact string match.
pub const VENTURA10: &str = "VENTURA10";

/// A recognized discount code and the share of the subtotal it takes off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coupon {
    pub code: String,
    pub rate: Decimal,
}

/// Static lookup table of recognized coupons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouponTable {
    coupons: Vec<Coupon>,
}

impl CouponTable {
    pub fn new(coupons: Vec<Coupon>) -> Self { Self { coupons } }

    /// Case-sensitive, whitespace-sensitive lookup.
    pub fn lookup(&self, code: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|c| c.code == code)
    }

    pub fn rate_for(&self, code: &str) -> Option<Decimal> { self.lookup(code).map(|c| c.rate) }
}

impl Default for CouponTable {
    fn default() -> Self {
        Self::new(vec![Coupon { code: VENTURA10.to_string(), rate: Decimal::new(10, 2) }])
    }
}

/// Store-wide pricing constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Subtotals strictly above this ship for free.
    pub free_shipping_threshold: Money,
    pub flat_shipping_fee: Money,
    pub tax_rate: Decimal,
    /// Floor applied to the amount sent to the payment provider.
    pub min_transaction_amount: Money,
    pub coupons: CouponTable,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::new(500_000),
            flat_shipping_fee: Money::new(50_000),
            tax_rate: Decimal::new(9, 2),
            min_transaction_amount: Money::new(1_000),
            coupons: CouponTable::default(),
        }
    }
}

impl PricingPolicy {
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_threshold { Money::ZERO } else { self.flat_shipping_fee }
    }

    pub fn tax_for(&self, subtotal: Money) -> Money { subtotal.apply_rate(self.tax_rate) }

    pub fn discount_for(&self, subtotal: Money, coupon: Option<&str>) -> Money {
        coupon
            .and_then(|code| self.coupons.rate_for(code))
            .map(|rate| subtotal.apply_rate(rate))
            .unwrap_or(Money::ZERO)
    }

    /// Full breakdown for a subtotal and an optionally applied coupon.
    pub fn price(&self, subtotal: Money, total_items: u64, coupon: Option<&str>) -> CartTotals {
        let shipping = self.shipping_for(subtotal);
        let tax = self.tax_for(subtotal);
        let discount = self.discount_for(subtotal, coupon);
        CartTotals {
            subtotal,
            shipping,
            tax,
            discount,
            total: subtotal + shipping + tax - discount,
            total_items,
            coupon: coupon.filter(|c| self.coupons.lookup(c).is_some()).map(str::to_string),
        }
    }

    /// Amount actually charged: the final total, never below the provider minimum.
    pub fn chargeable(&self, totals: &CartTotals) -> Money {
        totals.total.max(self.min_transaction_amount)
    }
}

/// Derived totals; recomputed on every read, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub total_items: u64,
    pub coupon: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_threshold() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_for(Money::new(600_000)), Money::ZERO);
        assert_eq!(policy.shipping_for(Money::new(400_000)), Money::new(50_000));
        // threshold itself is not "above"
        assert_eq!(policy.shipping_for(Money::new(500_000)), Money::new(50_000));
    }

    #[test]
    fn test_coupon_discount() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.discount_for(Money::new(1_000_000), Some("VENTURA10")), Money::new(100_000));
        assert_eq!(policy.discount_for(Money::new(1_000_000), Some("ventura10")), Money::ZERO);
        assert_eq!(policy.discount_for(Money::new(1_000_000), Some("SAVE50")), Money::ZERO);
        assert_eq!(policy.discount_for(Money::new(1_000_000), None), Money::ZERO);
    }

    #[test]
    fn test_full_breakdown() {
        let policy = PricingPolicy::default();
        let totals = policy.price(Money::new(1_000_000), 4, Some(VENTURA10));
        assert_eq!(totals.shipping, Money::ZERO);
        assert_eq!(totals.tax, Money::new(90_000));
        assert_eq!(totals.discount, Money::new(100_000));
        assert_eq!(totals.total, Money::new(990_000));
        assert_eq!(totals.coupon.as_deref(), Some(VENTURA10));

        let small = policy.price(Money::new(400_000), 1, None);
        assert_eq!(small.total, Money::new(400_000 + 50_000 + 36_000));
    }

    #[test]
    fn test_chargeable_floor() {
        let policy = PricingPolicy { flat_shipping_fee: Money::ZERO, ..PricingPolicy::default() };
        let totals = policy.price(Money::new(500), 1, None);
        assert_eq!(policy.chargeable(&totals), Money::new(1_000));
        let big = policy.price(Money::new(20_000), 1, None);
        assert_eq!(policy.chargeable(&big), big.total);
    }
}
