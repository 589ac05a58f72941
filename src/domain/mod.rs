//! Cart domain: value objects, the cart aggregate, pricing and events.
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;

pub use aggregates::{Cart, CartLineItem, ProductSnapshot};
pub use events::{CartEvent, CheckoutEvent};
pub use pricing::{CartTotals, Coupon, CouponTable, PricingPolicy};
pub use value_objects::{CartKey, CartKeyError, Money, Quantity};
