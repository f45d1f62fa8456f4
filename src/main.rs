//! FitBook backend entrypoint.
//!
//! Loads configuration, wires the Postgres adapters and payment gateway
//! into the application state, and serves the HTTP API.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitbook::adapters::gateway::{GatewayConfig, HttpPaymentGateway};
use fitbook::adapters::http::{billing_router, BillingAppState};
use fitbook::adapters::postgres::{
    PostgresAppointmentRepository, PostgresCheckoutIntentRepository, PostgresEventStore,
    PostgresSubscriptionRepository,
};
use fitbook::application::handlers::billing::HandleGatewayWebhookHandler;
use fitbook::config::AppConfig;
use fitbook::domain::billing::{EventDispatcher, WebhookVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.server.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.is_production() && config.payment.is_test_mode() {
        tracing::warn!("production environment with a test mode gateway key");
    }

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await?;
    tracing::info!("connected to database");

    let appointments = Arc::new(PostgresAppointmentRepository::new(pool.clone()));
    let subscriptions = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let intents = Arc::new(PostgresCheckoutIntentRepository::new(pool.clone()));
    let event_store = Arc::new(PostgresEventStore::new(pool));

    let gateway = Arc::new(HttpPaymentGateway::new(
        GatewayConfig::new(
            config.payment.gateway_api_key.clone(),
            config.payment.gateway_api_base_url.clone(),
        )
        .with_timeout(Duration::from_secs(config.payment.gateway_timeout_secs)),
    ));

    let dispatcher = Arc::new(EventDispatcher::new(
        event_store,
        appointments.clone(),
        subscriptions.clone(),
        intents.clone(),
    ));
    let webhook = Arc::new(HandleGatewayWebhookHandler::new(
        WebhookVerifier::new(config.payment.gateway_webhook_secret.clone()),
        dispatcher,
        config.payment.require_livemode,
    ));

    let state = BillingAppState {
        appointments,
        subscriptions,
        intents,
        gateway,
        webhook,
        checkout_success_url: config.payment.checkout_success_url.clone(),
        checkout_cancel_url: config.payment.checkout_cancel_url.clone(),
    };

    let cors = if config.server.cors_origins_list().is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .server
            .cors_origins_list()
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = axum::Router::new()
        .nest("/api", billing_router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors)
        .with_state(state);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
