//! HTTP surface: per-session cart endpoints, checkout and payment callback.

pub mod events;
pub mod sessions;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::checkout::{CheckoutHandoff, PaymentCallback, PaymentLedger, PaymentOutcome, PaymentRedirect};
use crate::domain::{CartKey, CartLineItem, CartTotals, CheckoutEvent, Money, ProductSnapshot};
use crate::store::CartStore;
use crate::{Result, StorefrontError};
pub use events::{EventPublisher, SessionEvent};
pub use sessions::{CartBackend, SessionCarts};

#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<SessionCarts>,
    pub checkout: CheckoutHandoff,
    pub ledger: PaymentLedger,
    pub publisher: EventPublisher,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "ventura-storefront"})) }))
        .route("/api/v1/cart/:session", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items", post(add_item))
        .route("/api/v1/cart/:session/items/:id", put(update_item).delete(remove_item))
        .route("/api/v1/cart/:session/coupon", post(apply_coupon).delete(remove_coupon))
        .route("/api/v1/checkout/:session", post(checkout))
        .route("/payment/callback", get(payment_callback))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidCartKey(_) | Self::EmptyCart => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::GatewayTransport(_) | Self::GatewayStatus(_) | Self::GatewayRejected => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Storage(_) | Self::Serialization(_) | Self::Database(_) | Self::Messaging(_) | Self::Worker(_) => {
                tracing::error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub session: String,
    pub items: Vec<CartLineItem>,
    pub totals: CartTotals,
}

impl CartView {
    fn of(session: impl Into<String>, store: &CartStore) -> Self {
        Self { session: session.into(), items: store.items().to_vec(), totals: store.totals() }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(url)]
    pub image: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)] pub struct UpdateQuantityRequest { pub quantity: i64 }

/// Any code is accepted; unrecognized ones are simply not applied.
#[derive(Debug, Deserialize)] pub struct CouponRequest { pub code: String }

#[derive(Debug, Serialize)] pub struct CouponResponse { pub applied: bool, pub cart: CartView }

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>> {
    let key = CartKey::new(session)?;
    Ok(Json(s.carts.read_cart(&key, |store| CartView::of(key.as_str(), store)).await?))
}

async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddItemRequest>) -> Result<Json<CartView>> {
    let key = CartKey::new(session)?;
    r.validate()?;
    let product = ProductSnapshot { id: r.id, name: r.name, price: Money::new(r.price), image: r.image };
    let qty = r.quantity.unwrap_or(1);
    let view = key.to_string();
    Ok(Json(s.carts.with_cart(&key, move |store| { store.add_item(product, qty); CartView::of(view, store) }).await?))
}

async fn update_item(State(s): State<AppState>, Path((session, id)): Path<(String, String)>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartView>> {
    let key = CartKey::new(session)?;
    let view = key.to_string();
    Ok(Json(s.carts.with_cart(&key, move |store| { store.update_quantity(&id, r.quantity); CartView::of(view, store) }).await?))
}

async fn remove_item(State(s): State<AppState>, Path((session, id)): Path<(String, String)>) -> Result<Json<CartView>> {
    let key = CartKey::new(session)?;
    let view = key.to_string();
    Ok(Json(s.carts.with_cart(&key, move |store| { store.remove_item(&id); CartView::of(view, store) }).await?))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode> {
    let key = CartKey::new(session)?;
    s.carts.with_cart(&key, CartStore::clear_cart).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_coupon(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<CouponRequest>) -> Result<Json<CouponResponse>> {
    let key = CartKey::new(session)?;
    let view = key.to_string();
    let (applied, cart) = s.carts.with_cart(&key, move |store| (store.apply_coupon(&r.code), CartView::of(view, store))).await?;
    Ok(Json(CouponResponse { applied, cart }))
}

async fn remove_coupon(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>> {
    let key = CartKey::new(session)?;
    let view = key.to_string();
    Ok(Json(s.carts.with_cart(&key, move |store| { store.remove_coupon(); CartView::of(view, store) }).await?))
}

async fn checkout(State(s): State<AppState>, Path(session): Path<String>, body: Option<Json<CheckoutRequest>>) -> Result<Json<PaymentRedirect>> {
    let key = CartKey::new(session)?;
    let r = body.map(|Json(r)| r).unwrap_or_default();
    r.validate()?;
    let totals = s.carts.read_cart(&key, |store| store.totals()).await?;
    let request = s.checkout.prepare(&totals, s.carts.policy(), r.description)?;

    match s.checkout.initiate(&request).await {
        Ok(redirect) => {
            if let Err(e) = s.ledger.record_initiated(key.as_str(), &request.description, &redirect).await {
                tracing::warn!(error = %e, session = %key, "failed to record payment attempt");
            }
            publish_checkout(&s, CheckoutEvent::Initiated { session: key.to_string(), amount: redirect.amount, track_id: redirect.track_id.clone() }).await;
            Ok(Json(redirect))
        }
        Err(e) => {
            tracing::warn!(error = %e, session = %key, amount = request.amount.amount(), "checkout handoff failed");
            if let Err(le) = s.ledger.record_failed(key.as_str(), &request.description, request.amount, &e.to_string()).await {
                tracing::warn!(error = %le, session = %key, "failed to record failed payment attempt");
            }
            publish_checkout(&s, CheckoutEvent::Failed { session: key.to_string(), amount: request.amount, reason: e.to_string() }).await;
            Err(e)
        }
    }
}

async fn payment_callback(State(s): State<AppState>, Query(q): Query<PaymentCallback>) -> Json<PaymentOutcome> {
    let outcome = q.outcome();
    tracing::info!(success = outcome.success, status = %outcome.status, track_id = ?outcome.track_id, "payment callback");
    match s.ledger.record_outcome(&outcome).await {
        Ok(0) if s.ledger.is_enabled() => tracing::warn!(track_id = ?outcome.track_id, "callback matched no payment attempt"),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to record payment outcome"),
    }
    publish_checkout(&s, CheckoutEvent::Completed { track_id: outcome.track_id.clone(), status: outcome.status.clone(), success: outcome.success }).await;
    Json(outcome)
}

async fn publish_checkout(s: &AppState, event: CheckoutEvent) {
    if let Err(e) = s.publisher.publish_checkout(&event).await {
        tracing::warn!(error = %e, event = event.kind(), "failed to publish checkout event");
    }
}
