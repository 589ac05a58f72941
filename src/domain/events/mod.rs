//! Domain events
use serde::Serialize;

use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { product_id: String, quantity: u32 },
    QuantityUpdated { product_id: String, quantity: u32 },
    ItemRemoved { product_id: String },
    Cleared,
    CouponApplied { code: String },
    CouponRemoved,
    /// The cart was replaced by what storage currently holds.
    Reloaded,
}

impl CartEvent {
    /// Short name used as the trailing token of a message subject.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ItemAdded { .. } => "item_added",
            Self::QuantityUpdated { .. } => "quantity_updated",
            Self::ItemRemoved { .. } => "item_removed",
            Self::Cleared => "cleared",
            Self::CouponApplied { .. } => "coupon_applied",
            Self::CouponRemoved => "coupon_removed",
            Self::Reloaded => "reloaded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    Initiated { session: String, amount: Money, track_id: Option<String> },
    Failed { session: String, amount: Money, reason: String },
    Completed { track_id: Option<String>, status: String, success: bool },
}

impl CheckoutEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initiated { .. } => "initiated",
            Self::Failed { .. } => "failed",
            Self::Completed { .. } => "completed",
        }
    }
}
