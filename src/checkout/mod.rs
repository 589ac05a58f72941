//! Checkout handoff: turn cart totals into one payment-initiation request
//! and interpret the provider's callback.

pub mod gateway;
pub mod ledger;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{CartTotals, Money, PricingPolicy};
use crate::{Result, StorefrontError};
pub use gateway::{HttpPaymentGateway, PaymentGateway, PaymentRequest, PaymentResponse};
pub use ledger::PaymentLedger;

/// Provider status values that mean the payment went through.
pub const SUCCESS_STATUSES: [&str; 3] = ["1", "2", "success"];

/// Where to send the shopper next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRedirect {
    pub payment_url: String,
    pub track_id: Option<String>,
    pub amount: Money,
}

#[derive(Clone)]
pub struct CheckoutHandoff {
    gateway: Arc<dyn PaymentGateway>,
    callback_url: String,
}

impl CheckoutHandoff {
    pub fn new(gateway: Arc<dyn PaymentGateway>, callback_url: impl Into<String>) -> Self {
        Self { gateway, callback_url: callback_url.into() }
    }

    /// Builds the provider request. The amount is the cart's final total,
    /// raised to the provider minimum when it falls short.
    pub fn prepare(&self, totals: &CartTotals, policy: &PricingPolicy, description: Option<String>) -> Result<PaymentRequest> {
        if totals.total_items == 0 {
            return Err(StorefrontError::EmptyCart);
        }
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| default_description(totals.total_items));
        Ok(PaymentRequest {
            amount: policy.chargeable(totals),
            description,
            callback_url: self.callback_url.clone(),
        })
    }

    /// One attempt. A response without a payment URL counts as a refusal.
    pub async fn initiate(&self, request: &PaymentRequest) -> Result<PaymentRedirect> {
        let resp = self.gateway.request_payment(request).await?;
        let track_id = resp.track_id();
        let payment_url = resp.payment_url.filter(|u| !u.is_empty()).ok_or(StorefrontError::GatewayRejected)?;
        tracing::info!(amount = request.amount.amount(), track_id = ?track_id, "payment initiated");
        Ok(PaymentRedirect { payment_url, track_id, amount: request.amount })
    }
}

fn default_description(total_items: u64) -> String {
    if total_items == 1 { "Order of 1 item".to_string() } else { format!("Order of {total_items} items") }
}

/// Query parameters the provider appends when sending the shopper back.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PaymentCallback {
    pub status: Option<String>,
    #[serde(rename = "trackId")]
    pub track_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub success: bool,
    pub status: String,
    pub track_id: Option<String>,
}

impl PaymentCallback {
    pub fn outcome(self) -> PaymentOutcome {
        let status = self.status.unwrap_or_default();
        PaymentOutcome { success: is_success_status(&status), status, track_id: self.track_id }
    }
}

pub fn is_success_status(status: &str) -> bool { SUCCESS_STATUSES.contains(&status) }
