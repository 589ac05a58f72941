//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::CartEvent;
use crate::domain::pricing::{CartTotals, PricingPolicy};
use crate::domain::value_objects::{Money, Quantity};

/// Catalog data copied into the cart when a product is added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: Option<String>,
}

/// One cart entry. Name, price and image are frozen at add-time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    pub fn line_total(&self) -> Money { self.price * self.quantity.value() }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartLineItem>,
    coupon: Option<String>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a cart from persisted items, folding duplicate ids and
    /// dropping zero-quantity lines.
    pub fn from_items(items: Vec<CartLineItem>) -> Self {
        let mut cart = Self::new();
        for item in items.into_iter().filter(|i| i.quantity.value() > 0) {
            match cart.items.iter_mut().find(|i| i.id == item.id) {
                Some(existing) => existing.quantity = existing.quantity.add(item.quantity),
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn coupon(&self) -> Option<&str> { self.coupon.as_deref() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn line_count(&self) -> usize { self.items.len() }

    /// Badge count: sum of quantities, not distinct lines.
    pub fn total_items(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity.value())).sum() }

    pub fn subtotal(&self) -> Money { self.items.iter().map(CartLineItem::line_total).sum() }

    pub fn totals(&self, policy: &PricingPolicy) -> CartTotals {
        policy.price(self.subtotal(), self.total_items(), self.coupon())
    }

    pub fn add_item(&mut self, product: ProductSnapshot, qty: i64) -> CartEvent {
        let qty = Quantity::at_least_one(qty);
        let quantity = match self.items.iter_mut().find(|i| i.id == product.id) {
            Some(existing) => {
                existing.quantity = existing.quantity.add(qty);
                existing.quantity
            }
            None => {
                self.items.push(CartLineItem {
                    id: product.id.clone(),
                    name: product.name,
                    price: product.price,
                    quantity: qty,
                    image: product.image,
                    added_at: Utc::now(),
                });
                qty
            }
        };
        CartEvent::ItemAdded { product_id: product.id, quantity: quantity.value() }
    }

    /// `None` when nothing changed (unknown id).
    pub fn update_quantity(&mut self, product_id: &str, qty: i64) -> Option<CartEvent> {
        let Some(qty) = Quantity::positive(qty) else { return self.remove_item(product_id); };
        let item = self.items.iter_mut().find(|i| i.id == product_id)?;
        item.quantity = qty;
        Some(CartEvent::QuantityUpdated { product_id: product_id.to_string(), quantity: qty.value() })
    }

    pub fn remove_item(&mut self, product_id: &str) -> Option<CartEvent> {
        let before = self.items.len();
        self.items.retain(|i| i.id != product_id);
        (self.items.len() != before).then(|| CartEvent::ItemRemoved { product_id: product_id.to_string() })
    }

    /// `None` when there was nothing to clear.
    pub fn clear(&mut self) -> Option<CartEvent> {
        if self.items.is_empty() && self.coupon.is_none() { return None; }
        self.items.clear();
        self.coupon = None;
        Some(CartEvent::Cleared)
    }

    /// Unrecognized codes leave the cart untouched, including any coupon
    /// applied earlier.
    pub fn apply_coupon(&mut self, code: &str, policy: &PricingPolicy) -> Option<CartEvent> {
        let coupon = policy.coupons.lookup(code)?;
        self.coupon = Some(coupon.code.clone());
        Some(CartEvent::CouponApplied { code: coupon.code.clone() })
    }

    pub fn remove_coupon(&mut self) -> Option<CartEvent> {
        self.coupon.take().map(|_| CartEvent::CouponRemoved)
    }

    /// Swaps in a freshly loaded item list; the coupon is session state and stays.
    pub(crate) fn replace_items(&mut self, items: Vec<CartLineItem>) {
        self.items = Cart::from_items(items).items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64) -> ProductSnapshot {
        ProductSnapshot { id: id.into(), name: format!("Product {id}"), price: Money::new(price), image: None }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new();
        cart.add_item(product("p1", 100_000), 2);
        cart.add_item(product("p2", 50_000), 1);
        assert_eq!(cart.subtotal(), Money::new(250_000));
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_repeated_adds_merge() {
        let mut cart = Cart::new();
        for qty in [1, 3, 2] {
            cart.add_item(product("p1", 10), qty);
        }
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 6);
    }

    #[test]
    fn test_non_positive_add_counts_as_one() {
        let mut cart = Cart::new();
        cart.add_item(product("p1", 10), 0);
        cart.add_item(product("p1", 10), -5);
        assert_eq!(cart.items()[0].quantity.value(), 2);
    }

    #[test]
    fn test_snapshot_kept_on_increment() {
        let mut cart = Cart::new();
        cart.add_item(product("p1", 100), 1);
        let first_added = cart.items()[0].added_at;
        cart.add_item(ProductSnapshot { name: "Renamed".into(), ..product("p1", 999) }, 1);
        let line = &cart.items()[0];
        assert_eq!(line.name, "Product p1");
        assert_eq!(line.price, Money::new(100));
        assert_eq!(line.added_at, first_added);
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new();
        cart.add_item(product("p1", 10), 1);
        cart.add_item(product("p2", 10), 1);
        assert!(cart.update_quantity("p1", 7).is_some());
        assert_eq!(cart.items()[0].quantity.value(), 7);
        assert_eq!(cart.update_quantity("p1", 0), Some(CartEvent::ItemRemoved { product_id: "p1".into() }));
        assert!(cart.items().iter().all(|i| i.id != "p1"));
        assert_eq!(cart.update_quantity("missing", 3), None);
        assert_eq!(cart.update_quantity("missing", -1), None);
    }

    #[test]
    fn test_remove_and_order() {
        let mut cart = Cart::new();
        for id in ["a", "b", "c"] {
            cart.add_item(product(id, 1), 1);
        }
        assert!(cart.remove_item("b").is_some());
        assert!(cart.remove_item("b").is_none());
        let ids: Vec<_> = cart.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn test_coupon_and_clear() {
        let policy = PricingPolicy::default();
        let mut cart = Cart::new();
        cart.add_item(product("p1", 1_000_000), 1);
        assert!(cart.apply_coupon("BOGUS", &policy).is_none());
        assert_eq!(cart.totals(&policy).discount, Money::ZERO);
        assert!(cart.apply_coupon("VENTURA10", &policy).is_some());
        assert_eq!(cart.totals(&policy).discount, Money::new(100_000));
        // unknown code after a valid one keeps the valid one
        assert!(cart.apply_coupon("BOGUS", &policy).is_none());
        assert_eq!(cart.coupon(), Some("VENTURA10"));

        assert_eq!(cart.clear(), Some(CartEvent::Cleared));
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::ZERO);
        assert_eq!(cart.coupon(), None);
        assert_eq!(cart.clear(), None);
    }

    #[test]
    fn test_from_items_folds_duplicates() {
        let line = CartLineItem {
            id: "p1".into(), name: "P".into(), price: Money::new(5), quantity: Quantity::at_least_one(2),
            image: None, added_at: Utc::now(),
        };
        let cart = Cart::from_items(vec![line.clone(), line]);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_items(), 4);
    }
}
