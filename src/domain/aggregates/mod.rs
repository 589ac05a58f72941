//! Aggregates module
pub mod cart;

pub use cart::{Cart, CartLineItem, ProductSnapshot};
