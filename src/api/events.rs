//! Fan-out of cart and checkout events to NATS.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::{CartEvent, CheckoutEvent};
use crate::{Result, StorefrontError};

/// A cart event tagged with the session whose cart produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub session: String,
    #[serde(flatten)]
    pub event: CartEvent,
}

/// Publishes to NATS when connected; otherwise only logs.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }
    pub fn disabled() -> Self { Self::default() }

    pub async fn publish_cart(&self, event: &SessionEvent) -> Result<()> {
        self.publish(format!("storefront.cart.{}", event.event.kind()), event).await
    }

    pub async fn publish_checkout(&self, event: &CheckoutEvent) -> Result<()> {
        self.publish(format!("storefront.checkout.{}", event.kind()), event).await
    }

    async fn publish<T: Serialize>(&self, subject: String, payload: &T) -> Result<()> {
        let Some(nats) = &self.nats else {
            tracing::debug!(%subject, "nats not configured; event dropped");
            return Ok(());
        };
        let body = serde_json::to_vec(payload)?;
        nats.publish(subject, body.into()).await.map_err(|e| StorefrontError::Messaging(e.to_string()))
    }
}

/// Drains cart events until every sender is gone.
pub async fn forward_cart_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>, publisher: EventPublisher) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = publisher.publish_cart(&event).await {
            tracing::warn!(error = %e, session = %event.session, "failed to publish cart event");
        }
    }
    tracing::debug!("cart event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_shape() {
        let event = SessionEvent {
            session: "s1".into(),
            event: CartEvent::ItemAdded { product_id: "p1".into(), quantity: 2 },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({ "session": "s1", "type": "item_added", "product_id": "p1", "quantity": 2 }));
    }

    #[tokio::test]
    async fn test_forwarder_drains_without_nats() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(SessionEvent { session: "s1".into(), event: CartEvent::Cleared }).unwrap();
        drop(tx);
        forward_cart_events(rx, EventPublisher::disabled()).await;
        EventPublisher::disabled()
            .publish_checkout(&CheckoutEvent::Completed { track_id: None, status: "1".into(), success: true })
            .await
            .unwrap();
    }
}
