//! Payment Error Types

use std::time::Duration;
use thiserror::Error;

use pdfdesk_core::AccountError;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Processor call did not complete in time
    #[error("Payment processor timed out after {0:?}")]
    Timeout(Duration),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Account store failure
    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Stripe(_) | Self::Timeout(_) => true,
            Self::Account(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Stripe(_) | Self::Timeout(_) => "Payment processing failed. Please try again.",
            Self::SignatureInvalid(_) => "Invalid signature.",
            Self::Account(e) => e.user_message(),
            Self::Config(_) => "Service configuration error.",
            Self::WebhookParse(_) => "An error occurred processing your request.",
        }
    }
}
