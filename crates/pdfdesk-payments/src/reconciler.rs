//! Payment Reconciler
//!
//! The only writer of plan state. Per account:
//!
//! ```text
//!            initiate (no change)
//!          ┌──────────┐
//!          ▼          │
//!        free ────────┴──── webhook: checkout completed ───▶ premium ◀──┐
//!          │                                                   │       │
//!          └──────── success redirect (optimistic) ────────────┘  replays
//! ```
//!
//! `premium` is absorbing. Webhook signature failure is the only rejection;
//! unknown accounts and replays are acknowledged without error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pdfdesk_core::{AccountStore, UpgradeOutcome, normalize_email};

use crate::checkout::{CheckoutProcessor, CheckoutRequest, CheckoutSession, Product};
use crate::error::{PaymentError, Result};
use crate::signature::SignatureVerifier;
use crate::webhook::WebhookEvent;

/// Reconciler configuration
#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Where the processor sends the buyer after paying
    pub success_url: String,

    /// Where the processor sends the buyer after cancelling
    pub cancel_url: String,

    /// Product sold at checkout
    pub product: Product,

    /// Bound on processor calls
    pub timeout: Duration,

    /// Upgrade on the success redirect alone, before any webhook arrives
    pub trust_success_redirect: bool,
}

impl ReconcilerConfig {
    /// Callback URLs under `base_url`
    pub fn for_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success_url: format!("{base}/success"),
            cancel_url: format!("{base}/cancel"),
            product: Product::premium(),
            timeout: Duration::from_secs(10),
            trust_success_redirect: true,
        }
    }
}

/// What a webhook delivery did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Account moved to premium
    Upgraded { email: String },

    /// Account was already premium (replay or redirect got there first)
    AlreadyPremium { email: String },

    /// No account for the paying email; event dropped
    UnknownAccount { email: String },

    /// Completed checkout without a usable email; event dropped
    MissingEmail { session_id: String },

    /// Payment has not settled yet
    Pending { session_id: String },

    /// Verified but unreadable payload; event dropped
    Unreadable { reason: String },

    /// Event type the reconciler does not act on
    Ignored { event_type: String },
}

/// What the success redirect did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// The redirect changed (or confirmed) the account's plan
    Applied(UpgradeOutcome),

    /// Redirects are informational; the webhook will upgrade the account
    AwaitingWebhook,
}

/// Reconciles payment processor state with local plan state
pub struct PaymentReconciler {
    accounts: Arc<dyn AccountStore>,
    processor: Arc<dyn CheckoutProcessor>,
    verifier: SignatureVerifier,
    config: ReconcilerConfig,
}

impl PaymentReconciler {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        processor: Arc<dyn CheckoutProcessor>,
        verifier: SignatureVerifier,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            accounts,
            processor,
            verifier,
            config,
        }
    }

    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.timeout, call)
            .await
            .map_err(|_| PaymentError::Timeout(self.config.timeout))?
    }

    /// Start a checkout for `email`, creating the account if needed
    ///
    /// Returns the processor session; its `checkout_url` is handed to the
    /// caller as a redirect target. No plan state changes.
    pub async fn initiate(&self, email: &str) -> Result<CheckoutSession> {
        let email = normalize_email(email)?;
        let account = self.accounts.get_or_create(&email).await?;

        if account.is_premium() {
            tracing::info!(email = %email, "Checkout requested by premium account");
        }

        let request = CheckoutRequest {
            product: self.config.product.clone(),
            customer_email: email.clone(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
        };

        let session = self
            .bounded(self.processor.create_checkout_session(&request))
            .await?;

        tracing::info!(
            email = %email,
            session_id = %session.id,
            processor = self.processor.name(),
            "Created checkout session"
        );

        Ok(session)
    }

    /// Handle the buyer landing on the success URL
    ///
    /// Trusts the redirect alone when `trust_success_redirect` is set: there
    /// is no proof the payment completed.
    pub async fn confirm_redirect(&self, email: &str) -> Result<RedirectOutcome> {
        if !self.config.trust_success_redirect {
            tracing::debug!(email = %email, "Success redirect; waiting for webhook");
            return Ok(RedirectOutcome::AwaitingWebhook);
        }

        let email = normalize_email(email)?;
        let outcome = self.accounts.upgrade_to_premium(&email).await?;

        tracing::info!(email = %email, outcome = ?outcome, "Optimistic upgrade from success redirect");
        Ok(RedirectOutcome::Applied(outcome))
    }

    /// Verify and apply a webhook delivery
    ///
    /// Signature failure is returned before the payload is even parsed.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome> {
        self.verifier.verify(payload, signature)?;

        match WebhookEvent::parse(payload) {
            Ok(event) => self.apply(event).await,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unreadable webhook payload");
                Ok(WebhookOutcome::Unreadable {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Apply an already verified event
    pub async fn apply(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        tracing::info!(event_id = %event.event_id(), "Processing Stripe webhook");

        match event {
            WebhookEvent::CheckoutCompleted {
                session_id,
                customer_email,
                ..
            } => {
                let Some(email) = customer_email.and_then(|raw| normalize_email(&raw).ok()) else {
                    tracing::warn!(session_id = %session_id, "Checkout completed without a usable email");
                    return Ok(WebhookOutcome::MissingEmail { session_id });
                };

                let outcome = match self.accounts.upgrade_to_premium(&email).await? {
                    UpgradeOutcome::Upgraded => {
                        tracing::info!(email = %email, session_id = %session_id, "Upgraded account to premium");
                        WebhookOutcome::Upgraded { email }
                    }
                    UpgradeOutcome::AlreadyPremium => {
                        tracing::debug!(email = %email, "Account already premium");
                        WebhookOutcome::AlreadyPremium { email }
                    }
                    UpgradeOutcome::NotFound => {
                        tracing::warn!(email = %email, session_id = %session_id, "No account for paying email");
                        WebhookOutcome::UnknownAccount { email }
                    }
                };
                Ok(outcome)
            }

            WebhookEvent::PaymentPending { session_id, .. } => {
                tracing::info!(session_id = %session_id, "Checkout payment pending");
                Ok(WebhookOutcome::Pending { session_id })
            }

            WebhookEvent::Other { event_type, .. } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }
}
