//! pdfdesk HTTP Server
//!
//! Axum-based server for plan-gated PDF merge, split and compress, with
//! premium upgrades through Stripe Checkout.

mod config;
mod error;
mod handlers;
mod identity;
mod routes;
mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfdesk_payments::StripeClient;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize payments
    let stripe = match StripeClient::from_env() {
        Ok(stripe) => {
            tracing::info!("✓ Stripe configured");
            Some(stripe)
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - payments disabled ({})", e);
            tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
            None
        }
    };

    // Build application state
    let state = AppState::from_config(&config, stripe).await?;
    tracing::info!(
        storage = state.storage.name(),
        documents = state.documents.name(),
        free_merge_limit = config.free_merge_limit,
        trust_success_redirect = config.trust_success_redirect,
        "Backends ready"
    );
    if let Some(payments) = &state.payments {
        let callbacks = payments.config();
        tracing::info!(
            success_url = %callbacks.success_url,
            cancel_url = %callbacks.cancel_url,
            "Checkout callbacks"
        );
    }

    let app = routes::router(state, config.max_upload_bytes);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 pdfdesk server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  POST /login                   - Start a session");
    tracing::info!("  POST /merge                   - Merge PDFs");
    tracing::info!("  POST /split                   - Split a PDF into pages");
    tracing::info!("  POST /compress                - Compress a PDF");
    tracing::info!("  POST /create-checkout-session - Upgrade to Premium");
    tracing::info!("  POST /webhook                 - Stripe webhook");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
