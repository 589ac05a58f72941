//! Ventura Storefront
//!
//! Cart, pricing and checkout handoff for the Ventura storefront.
//!
//! ## Features
//! - Cart aggregate with snapshot-at-add-time line items
//! - Derived totals: free-shipping threshold, tax, coupon discount
//! - Observable cart store with durable per-key storage
//! - One-shot checkout handoff to the payment provider
//! - HTTP service hosting one cart per browser session

use thiserror::Error;

pub mod api;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod store;

pub use domain::{Cart, CartEvent, CartLineItem, CartTotals, Money, PricingPolicy, ProductSnapshot};
pub use store::{CartStore, SubscriptionId};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid cart key: {0}")]
    InvalidCartKey(#[from] domain::CartKeyError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Payment gateway unreachable: {0}")]
    GatewayTransport(#[from] reqwest::Error),

    #[error("Payment gateway responded with status {0}")]
    GatewayStatus(u16),

    #[error("Payment gateway returned no payment URL")]
    GatewayRejected,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Cart worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
