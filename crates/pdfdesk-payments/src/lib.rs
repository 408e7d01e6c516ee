//! # pdfdesk-payments
//!
//! Premium upgrades through Stripe Checkout (Hosted), reconciled into the
//! account store.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │   pdfdesk   │────▶│  Stripe Hosted  │────▶│   pdfdesk   │
//! │  (checkout) │     │  Checkout Page  │     │  (success)  │
//! └─────────────┘     └────────┬────────┘     └─────────────┘
//!                              │ signed webhook
//!                              ▼
//!                     ┌─────────────────┐     ┌─────────────┐
//!                     │   Reconciler    │────▶│ AccountStore│
//!                     └─────────────────┘     └─────────────┘
//! ```
//!
//! The webhook is the authoritative confirmation. The success redirect can
//! optionally upgrade optimistically (see
//! [`ReconcilerConfig::trust_success_redirect`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdfdesk_payments::{PaymentReconciler, ReconcilerConfig, SignatureVerifier, StripeClient};
//!
//! let stripe = StripeClient::new("sk_test_xxx", "whsec_xxx");
//! let verifier = SignatureVerifier::new(stripe.webhook_secret());
//! let reconciler = PaymentReconciler::new(
//!     accounts,
//!     Arc::new(stripe),
//!     verifier,
//!     ReconcilerConfig::for_base_url("https://pdfdesk.example.com"),
//! );
//!
//! let session = reconciler.initiate("user@example.com").await?;
//! // Redirect user to: session.checkout_url
//! ```

mod checkout;
mod error;
mod reconciler;
mod signature;
mod webhook;

pub use checkout::{CheckoutProcessor, CheckoutRequest, CheckoutSession, Product, StripeClient};
pub use error::{PaymentError, Result};
pub use reconciler::{PaymentReconciler, ReconcilerConfig, RedirectOutcome, WebhookOutcome};
pub use signature::{SignatureVerifier, DEFAULT_TOLERANCE_SECS};
pub use webhook::WebhookEvent;
