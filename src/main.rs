//! Ventura Storefront - cart, pricing and checkout handoff service

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ventura_storefront::api::{self, events::forward_cart_events, AppState, CartBackend, EventPublisher, SessionCarts};
use ventura_storefront::checkout::{CheckoutHandoff, HttpPaymentGateway, PaymentLedger};
use ventura_storefront::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let ledger = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            PaymentLedger::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; payment attempts will not be recorded");
            PaymentLedger::disabled()
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; events will not be published");
                None
            }
        },
        None => None,
    };
    let publisher = EventPublisher::new(nats);

    let backend = match &config.cart_storage_dir {
        Some(dir) => CartBackend::Directory(dir.clone()),
        None => {
            tracing::warn!("CART_STORAGE_DIR not set; carts live in memory only");
            CartBackend::Memory
        }
    };
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(forward_cart_events(events_rx, publisher.clone()));
    let carts = SessionCarts::new(backend, Arc::new(config.pricing.clone()))
        .with_capacity(config.max_open_carts)
        .with_events(events_tx);

    let gateway = Arc::new(HttpPaymentGateway::new(&config.payment)?);
    let state = AppState {
        carts: Arc::new(carts),
        checkout: CheckoutHandoff::new(gateway, config.payment.callback_url.clone()),
        ledger,
        publisher,
    };

    let app = api::router(state);
    tracing::info!("Ventura storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
