//! Value Objects for the storefront cart

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// Key naming one persisted cart (a browser session or a storage slot).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartKey(String);

impl CartKey {
    pub const MAX_LEN: usize = 128;

    pub fn new(value: impl Into<String>) -> Result<Self, CartKeyError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(CartKeyError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(CartKeyError::TooLong); }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(CartKeyError::InvalidCharacter);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartKeyError { Empty, TooLong, InvalidCharacter }
impl std::error::Error for CartKeyError {}
impl fmt::Display for CartKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "cart key empty"),
            Self::TooLong => write!(f, "cart key too long"),
            Self::InvalidCharacter => write!(f, "cart key may only contain letters, digits, '-' and '_'"),
        }
    }
}

/// Money in the store's smallest display unit (toman).
///
/// Serialized as a bare integer so persisted carts stay `{"price": 100000}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(amount: i64) -> Self { Self(amount) }
    pub fn amount(&self) -> i64 { self.0 }

    /// `self × rate`, rounded half away from zero to a whole unit.
    pub fn apply_rate(&self, rate: Decimal) -> Money {
        let scaled = (Decimal::from(self.0) * rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Money(scaled.to_i64().unwrap_or(i64::MAX))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money(self.0.saturating_mul(i64::from(qty))) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, other: Money) -> Money { Money(self.0.saturating_add(other.0)) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, other: Money) -> Money { Money(self.0.saturating_sub(other.0)) }
}

impl Mul<u32> for Money {
    type Output = Money;
    fn mul(self, qty: u32) -> Money { self.multiply(qty) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, Add::add) }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self { Self(amount) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 { grouped.push(','); }
            grouped.push(ch);
        }
        if self.0 < 0 { write!(f, "-")?; }
        write!(f, "{} toman", grouped)
    }
}

/// Line-item quantity; never zero once inside a cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    /// Requested amounts from callers are signed; anything below one becomes one.
    pub fn at_least_one(requested: i64) -> Self {
        Self(u32::try_from(requested.max(1)).unwrap_or(u32::MAX))
    }

    /// `None` when the request means "remove the line".
    pub fn positive(requested: i64) -> Option<Self> {
        if requested <= 0 { None } else { Some(Self::at_least_one(requested)) }
    }

    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_key() {
        assert_eq!(CartKey::new(" sess-01_a ").unwrap().as_str(), "sess-01_a");
        assert_eq!(CartKey::new(""), Err(CartKeyError::Empty));
        assert_eq!(CartKey::new("../etc/passwd"), Err(CartKeyError::InvalidCharacter));
        assert_eq!(CartKey::new("x".repeat(129)), Err(CartKeyError::TooLong));
        assert_eq!(CartKey::new("x".repeat(128)).unwrap().as_str().len(), CartKey::MAX_LEN);
    }

    #[test]
    fn test_money_rate_rounding() {
        assert_eq!(Money::new(1_000_000).apply_rate(Decimal::new(10, 2)), Money::new(100_000));
        assert_eq!(Money::new(5).apply_rate(Decimal::new(5, 1)), Money::new(3));
        assert_eq!(Money::new(4).apply_rate(Decimal::new(9, 2)), Money::ZERO);
    }

    #[test]
    fn test_money_sum_and_display() {
        let total: Money = [Money::new(100_000) * 2, Money::new(50_000)].into_iter().sum();
        assert_eq!(total.amount(), 250_000);
        assert_eq!(total.to_string(), "250,000 toman");
        assert_eq!(Money::new(-1500).to_string(), "-1,500 toman");
    }

    #[test]
    fn test_quantity_clamping() {
        assert_eq!(Quantity::at_least_one(-3).value(), 1);
        assert_eq!(Quantity::at_least_one(0).value(), 1);
        assert_eq!(Quantity::at_least_one(4).value(), 4);
        assert_eq!(Quantity::positive(0), None);
        assert_eq!(Quantity::positive(2).map(|q| q.value()), Some(2));
    }
}
