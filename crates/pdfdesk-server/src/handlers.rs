//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use pdfdesk_core::{normalize_email, Decision, OperationKind, OperationRequest, Plan};
use pdfdesk_payments::{PaymentError, RedirectOutcome, WebhookOutcome};
use pdfdesk_storage::{object_key, ObjectStore, StoredObject};

use crate::error::AppError;
use crate::identity::Identity;
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
    pub storage: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub email: String,
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub file_url: String,
}

#[derive(Debug, Serialize)]
pub struct SplitResponse {
    pub split_files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompressResponse {
    pub compressed_file: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

// ============================================================================
// Health & Identity
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.payments.is_some(),
        storage: state.storage.name().to_string(),
    })
}

/// Start a session for an email, creating the account on first sight
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email)?;
    let account = state.accounts.get_or_create(&email).await?;

    tracing::info!(email = %account.email, plan = %account.plan, "Signed in");

    Ok((
        [(header::SET_COOKIE, state.sessions.cookie(&account.email))],
        Json(AccountResponse {
            email: account.email,
            plan: account.plan,
        }),
    ))
}

pub async fn account(identity: Identity) -> Json<AccountResponse> {
    Json(AccountResponse {
        email: identity.email,
        plan: identity.plan,
    })
}

// ============================================================================
// Document Operations
// ============================================================================

/// Collect non-empty file parts whose field name is in `fields`
async fn read_documents(multipart: &mut Multipart, fields: &[&str]) -> Result<Vec<Vec<u8>>, AppError> {
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?
    {
        if !field.name().is_some_and(|name| fields.contains(&name)) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed upload: {e}")))?;

        // Browsers send an empty part for an unused file input
        if !data.is_empty() {
            documents.push(data.to_vec());
        }
    }

    Ok(documents)
}

/// Exactly one document from the `pdf` field
async fn read_single_document(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    let mut documents = read_documents(multipart, &["pdf"]).await?;
    match documents.len() {
        1 => Ok(documents.remove(0)),
        0 => Err(AppError::BadRequest("No PDF uploaded in field 'pdf'".into())),
        n => Err(AppError::BadRequest(format!("Expected one PDF, got {n}"))),
    }
}

fn gate(state: &AppState, identity: &Identity, kind: OperationKind, input_count: usize) -> Result<(), AppError> {
    let request = OperationRequest::new(kind, input_count, identity.email.clone(), identity.plan);
    match state.policy.authorize_request(&request) {
        Decision::Allowed => Ok(()),
        Decision::Denied(reason) => Err(AppError::Denied(reason)),
    }
}

/// Run a document operation on the blocking pool
async fn run_blocking<T, F>(operation: F) -> Result<T, AppError>
where
    F: FnOnce() -> pdfdesk_documents::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| AppError::Internal(format!("Document task failed: {e}")))?
        .map_err(AppError::from)
}

pub async fn merge(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<MergeResponse>, AppError> {
    let documents = read_documents(&mut multipart, &["pdfs", "pdfs[]"]).await?;
    if documents.is_empty() {
        return Err(AppError::BadRequest("No PDFs uploaded in field 'pdfs'".into()));
    }

    gate(&state, &identity, OperationKind::Merge, documents.len())?;

    let count = documents.len();
    let service = state.documents.clone();
    let merged = run_blocking(move || service.merge(&documents)).await?;

    let stored = state
        .storage
        .put(&object_key("merge", "merged.pdf"), merged, PDF_CONTENT_TYPE)
        .await?;

    tracing::info!(email = %identity.email, inputs = count, key = %stored.key, "Merged PDFs");

    Ok(Json(MergeResponse {
        file_url: stored.url,
    }))
}

pub async fn split(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<SplitResponse>, AppError> {
    let document = read_single_document(&mut multipart).await?;

    gate(&state, &identity, OperationKind::Split, 1)?;

    let service = state.documents.clone();
    let pages = run_blocking(move || service.split(&document)).await?;

    let stored = store_pages(state.storage.as_ref(), pages).await?;
    let split_files: Vec<String> = stored.into_iter().map(|object| object.url).collect();

    tracing::info!(email = %identity.email, pages = split_files.len(), "Split PDF");

    Ok(Json(SplitResponse { split_files }))
}

/// Write split pages under one prefix, all or nothing
///
/// If a page fails to store, pages already written are deleted before the
/// error is returned.
async fn store_pages(
    storage: &dyn ObjectStore,
    pages: Vec<Vec<u8>>,
) -> Result<Vec<StoredObject>, AppError> {
    let prefix = object_key("split", "");
    let mut stored = Vec::with_capacity(pages.len());

    for (index, page) in pages.into_iter().enumerate() {
        let key = format!("{prefix}page-{}.pdf", index + 1);
        match storage.put(&key, page, PDF_CONTENT_TYPE).await {
            Ok(object) => stored.push(object),
            Err(e) => {
                for object in &stored {
                    if let Err(cleanup) = storage.delete(&object.key).await {
                        tracing::warn!(
                            key = %object.key,
                            error = %cleanup,
                            "Failed to remove partial split page"
                        );
                    }
                }
                return Err(e.into());
            }
        }
    }

    Ok(stored)
}

pub async fn compress(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<Json<CompressResponse>, AppError> {
    let document = read_single_document(&mut multipart).await?;

    gate(&state, &identity, OperationKind::Compress, 1)?;

    let service = state.documents.clone();
    let compressed = run_blocking(move || service.compress(&document)).await?;

    let stored = state
        .storage
        .put(&object_key("compress", "compressed.pdf"), compressed, PDF_CONTENT_TYPE)
        .await?;

    tracing::info!(email = %identity.email, size = stored.size, "Compressed PDF");

    Ok(Json(CompressResponse {
        compressed_file: stored.url,
    }))
}

/// Serve an object written to the configured store
pub async fn get_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let object = state
        .storage
        .get(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(key.clone()))?;

    Ok(([(header::CONTENT_TYPE, object.content_type)], object.data).into_response())
}

// ============================================================================
// Payments
// ============================================================================

pub async fn create_checkout(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<CheckoutResponse>, AppError> {
    let payments = state.payments.as_ref().ok_or(AppError::PaymentsDisabled)?;
    let session = payments.initiate(&identity.email).await?;

    Ok(Json(CheckoutResponse {
        url: session.checkout_url,
    }))
}

pub async fn checkout_success(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Html<String>, AppError> {
    let payments = state.payments.as_ref().ok_or(AppError::PaymentsDisabled)?;

    let message = match payments.confirm_redirect(&identity.email).await? {
        RedirectOutcome::Applied(_) => "Your account has been upgraded to Premium.",
        RedirectOutcome::AwaitingWebhook => {
            "Your account will be upgraded to Premium as soon as the payment is confirmed."
        }
    };

    Ok(Html(page("Payment successful", message)))
}

pub async fn checkout_cancel() -> Html<String> {
    Html(page(
        "Payment cancelled",
        "No payment was taken. Your plan has not changed.",
    ))
}

fn page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p><p><a href=\"/\">Back to pdfdesk</a></p></body></html>"
    )
}

/// Stripe webhook endpoint
///
/// 200 for any verified delivery (including no-ops), 400 for a bad
/// signature, 5xx when the account store fails so Stripe redelivers.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let payments = state.payments.as_ref().ok_or(AppError::PaymentsDisabled)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| PaymentError::SignatureInvalid("missing Stripe-Signature header".into()))?;

    match payments.handle_webhook(&body, signature).await {
        Ok(outcome) => {
            if let WebhookOutcome::Upgraded { email } = &outcome {
                tracing::info!(email = %email, "Premium activated from webhook");
            }
            Ok(Json(WebhookResponse { received: true }))
        }
        Err(e @ PaymentError::SignatureInvalid(_)) => {
            tracing::warn!(error = %e, "Rejected webhook");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
