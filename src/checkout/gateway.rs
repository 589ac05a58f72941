//! Payment provider client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PaymentConfig;
use crate::domain::Money;
use crate::{Result, StorefrontError};

/// Body of the payment-initiation call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Money,
    pub description: String,
    pub callback_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    #[serde(default)]
    pub payment_url: Option<String>,
    /// Providers send this as a number or a string.
    #[serde(default)]
    pub track_id: Option<Value>,
}

impl PaymentResponse {
    pub fn track_id(&self) -> Option<String> {
        match self.track_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Exactly one attempt; callers do not retry.
    async fn request_payment(&self, request: &PaymentRequest) -> Result<PaymentResponse>;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPaymentGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, endpoint: config.gateway_url.clone() })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn request_payment(&self, request: &PaymentRequest) -> Result<PaymentResponse> {
        tracing::info!(amount = request.amount.amount(), endpoint = %self.endpoint, "requesting payment");
        let resp = self.client.post(&self.endpoint).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "payment gateway refused request");
            return Err(StorefrontError::GatewayStatus(status.as_u16()));
        }
        Ok(resp.json::<PaymentResponse>().await?)
    }
}
