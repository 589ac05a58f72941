//! Observable cart store.
//!
//! A `CartStore` owns one cart, writes it through to a [`CartStorage`]
//! after every effective mutation and then calls its subscribers in
//! registration order. Operations never fail: storage problems are logged
//! and the in-memory cart stays authoritative.

pub mod storage;

use std::sync::Arc;

use crate::domain::{Cart, CartEvent, CartLineItem, CartTotals, Money, PricingPolicy, ProductSnapshot};
pub use storage::{CartStorage, JsonFileStorage, MemoryStorage};

type Listener = Box<dyn Fn(&CartEvent, &Cart) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct CartStore {
    cart: Cart,
    policy: Arc<PricingPolicy>,
    storage: Box<dyn CartStorage>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl CartStore {
    /// Opens the cart held by `storage`. Unreadable state starts an empty cart.
    pub fn open(storage: impl CartStorage + 'static, policy: Arc<PricingPolicy>) -> Self {
        let cart = match storage.load() {
            Ok(items) => Cart::from_items(items),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable stored cart");
                Cart::new()
            }
        };
        Self { cart, policy, storage: Box::new(storage), listeners: Vec::new(), next_subscription: 0 }
    }

    pub fn add_item(&mut self, product: ProductSnapshot, qty: i64) {
        let event = self.cart.add_item(product, qty);
        self.commit(event);
    }

    pub fn update_quantity(&mut self, product_id: &str, qty: i64) {
        if let Some(event) = self.cart.update_quantity(product_id, qty) {
            self.commit(event);
        }
    }

    pub fn remove_item(&mut self, product_id: &str) {
        if let Some(event) = self.cart.remove_item(product_id) {
            self.commit(event);
        }
    }

    pub fn clear_cart(&mut self) {
        if let Some(event) = self.cart.clear() {
            self.commit(event);
        }
    }

    /// Returns whether the code was recognized. Unknown codes change nothing.
    pub fn apply_coupon(&mut self, code: &str) -> bool {
        match self.cart.apply_coupon(code, &self.policy) {
            Some(event) => {
                self.commit(event);
                true
            }
            None => {
                tracing::debug!(code, "coupon not recognized");
                false
            }
        }
    }

    pub fn remove_coupon(&mut self) {
        if let Some(event) = self.cart.remove_coupon() {
            self.commit(event);
        }
    }

    pub fn items(&self) -> &[CartLineItem] { self.cart.items() }
    pub fn total_items(&self) -> u64 { self.cart.total_items() }
    pub fn total_price(&self) -> Money { self.cart.subtotal() }
    pub fn totals(&self) -> CartTotals { self.cart.totals(&self.policy) }
    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn policy(&self) -> &PricingPolicy { &self.policy }

    /// Re-reads storage, replacing the in-memory items. Whoever wrote last wins.
    pub fn reload(&mut self) {
        match self.storage.load() {
            Ok(items) => {
                self.cart.replace_items(items);
                self.notify(&CartEvent::Reloaded);
            }
            Err(e) => tracing::warn!(error = %e, "cart reload failed; keeping in-memory cart"),
        }
    }

    pub fn subscribe(&mut self, listener: impl Fn(&CartEvent, &Cart) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn commit(&mut self, event: CartEvent) {
        self.persist();
        self.notify(&event);
    }

    fn persist(&self) {
        let result = if self.cart.is_empty() {
            self.storage.clear()
        } else {
            self.storage.save(self.cart.items())
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist cart");
        }
    }

    fn notify(&self, event: &CartEvent) {
        tracing::trace!(event = event.kind(), items = self.cart.total_items(), "cart changed");
        for (_, listener) in &self.listeners {
            listener(event, &self.cart);
        }
    }
}
