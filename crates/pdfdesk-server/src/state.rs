//! Application State

use std::sync::Arc;

use pdfdesk_core::{AccountStore, MemoryAccountStore, PlanPolicy, SqliteAccountStore};
use pdfdesk_documents::{DocumentService, LopdfService};
use pdfdesk_payments::{PaymentReconciler, ReconcilerConfig, SignatureVerifier, StripeClient};
use pdfdesk_storage::{MemoryObjectStore, ObjectStore, S3ObjectStore};

use crate::config::AppConfig;
use crate::identity::SessionSigner;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Account records (email → plan)
    pub accounts: Arc<dyn AccountStore>,

    /// PDF operations
    pub documents: Arc<dyn DocumentService>,

    /// Where produced documents are written
    pub storage: Arc<dyn ObjectStore>,

    /// Payment reconciler (optional - None if Stripe is not configured)
    pub payments: Option<Arc<PaymentReconciler>>,

    /// Session cookie signing
    pub sessions: SessionSigner,

    /// Free-tier limits
    pub policy: PlanPolicy,
}

impl AppState {
    /// Wire up backends from configuration
    ///
    /// Anything left unconfigured falls back to an in-memory backend with a
    /// warning.
    pub async fn from_config(config: &AppConfig, stripe: Option<StripeClient>) -> anyhow::Result<Self> {
        let accounts: Arc<dyn AccountStore> = match &config.database_url {
            Some(url) => {
                let store = SqliteAccountStore::open(url).await?;
                tracing::info!("✓ Account store: SQLite");
                Arc::new(store)
            }
            None => {
                tracing::warn!("⚠ DATABASE_URL not set - accounts are kept in memory");
                Arc::new(MemoryAccountStore::new())
            }
        };

        let storage: Arc<dyn ObjectStore> = match &config.s3 {
            Some(s3) => {
                let store = S3ObjectStore::new(s3).await?;
                tracing::info!(bucket = store.bucket(), "✓ Object store: S3");
                Arc::new(store)
            }
            None => {
                tracing::warn!(
                    max_objects = config.memory_max_objects,
                    "⚠ S3_BUCKET not set - documents are kept in memory (development only)"
                );
                tracing::warn!("  The oldest documents are evicted once the limit is reached");
                Arc::new(MemoryObjectStore::with_capacity(
                    &config.public_base_url,
                    config.memory_max_objects,
                ))
            }
        };

        let sessions = match &config.session_secret {
            Some(secret) => SessionSigner::new(secret),
            None => {
                tracing::warn!("⚠ SESSION_SECRET not set - sessions end when the server restarts");
                SessionSigner::ephemeral()
            }
        };

        let payments = stripe.map(|stripe| {
            let verifier = SignatureVerifier::new(stripe.webhook_secret())
                .with_tolerance(config.webhook_tolerance_secs);
            Arc::new(PaymentReconciler::new(
                accounts.clone(),
                Arc::new(stripe),
                verifier,
                reconciler_config(config),
            ))
        });

        Ok(Self {
            accounts,
            documents: Arc::new(LopdfService::new()),
            storage,
            payments,
            sessions,
            policy: PlanPolicy::with_merge_limit(config.free_merge_limit),
        })
    }
}

pub fn reconciler_config(config: &AppConfig) -> ReconcilerConfig {
    ReconcilerConfig {
        timeout: config.upstream_timeout,
        trust_success_redirect: config.trust_success_redirect,
        ..ReconcilerConfig::for_base_url(&config.public_base_url)
    }
}
