//! HTTP Error Mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use pdfdesk_core::{AccountError, DenialReason};
use pdfdesk_documents::DocumentError;
use pdfdesk_payments::PaymentError;
use pdfdesk_storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Every way a request can fail
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("{0}")]
    Denied(DenialReason),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payments are not configured")]
    PaymentsDisabled,

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The same request may succeed if sent again
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Document(e) => e.is_retryable(),
            Self::Storage(e) => e.is_retryable(),
            Self::Account(e) => e.is_retryable(),
            Self::Payment(e) => e.is_retryable(),
            _ => false,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            Self::Denied(_) => (StatusCode::FORBIDDEN, "PLAN_LIMIT"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::PaymentsDisabled => (StatusCode::SERVICE_UNAVAILABLE, "PAYMENTS_DISABLED"),
            Self::Document(DocumentError::InvalidDocument(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_DOCUMENT")
            }
            Self::Document(DocumentError::Write(_)) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
            Self::Storage(e) => storage_status(e),
            Self::Account(e) => account_status(e),
            Self::Payment(e) => match e {
                PaymentError::SignatureInvalid(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
                PaymentError::WebhookParse(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
                PaymentError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
                PaymentError::Stripe(_) => (StatusCode::BAD_GATEWAY, "PAYMENT_FAILED"),
                PaymentError::Account(e) => account_status(e),
                PaymentError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG"),
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Denied(reason) => reason.user_message(),
            Self::Document(DocumentError::InvalidDocument(detail)) => {
                format!("Invalid PDF: {detail}")
            }
            Self::Account(e) => e.user_message().to_string(),
            Self::Payment(e) => e.user_message().to_string(),
            Self::Storage(_) | Self::Document(DocumentError::Write(_)) | Self::Internal(_) => {
                "An error occurred processing your request.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

const fn storage_status(error: &StorageError) -> (StatusCode, &'static str) {
    match error {
        StorageError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
        StorageError::Sdk(_) => (StatusCode::BAD_GATEWAY, "STORAGE_FAILED"),
        StorageError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG"),
    }
}

const fn account_status(error: &AccountError) -> (StatusCode, &'static str) {
    match error {
        AccountError::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "INVALID_EMAIL"),
        AccountError::UnknownPlan(_) | AccountError::Storage(_) | AccountError::Database(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "ACCOUNT_STORE")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, retryable = self.is_retryable(), "Request failed");
        } else {
            tracing::debug!(error = %self, code, "Request rejected");
        }

        // Plan denials are shown to the user verbatim
        if let Self::Denied(reason) = &self {
            return (status, reason.user_message()).into_response();
        }

        let body = ErrorResponse {
            error: self.message(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
