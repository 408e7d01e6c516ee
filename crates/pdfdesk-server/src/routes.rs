//! Router

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    account, checkout_cancel, checkout_success, compress, create_checkout, get_file,
    health_check, login, merge, not_found, split, stripe_webhook,
};
use crate::state::AppState;

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & identity
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/account", get(account))

        // Documents
        .route("/merge", post(merge))
        .route("/split", post(split))
        .route("/compress", post(compress))
        .route("/files/{*key}", get(get_file))

        // Payments
        .route("/create-checkout-session", post(create_checkout))
        .route("/success", get(checkout_success))
        .route("/cancel", get(checkout_cancel))
        .route("/webhook", post(stripe_webhook))

        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    use pdfdesk_core::{AccountStore, MemoryAccountStore, Plan, PlanPolicy};
    use pdfdesk_documents::fixtures::{page_contents, pdf_with_pages};
    use pdfdesk_documents::LopdfService;
    use pdfdesk_payments::{
        CheckoutProcessor, CheckoutRequest, CheckoutSession, PaymentReconciler, ReconcilerConfig,
        SignatureVerifier,
    };
    use pdfdesk_storage::{MemoryObjectStore, ObjectStore};

    use crate::identity::SessionSigner;

    const WEBHOOK_SECRET: &str = "whsec_test123secret456";
    const BASE_URL: &str = "http://localhost:3000";
    const BOUNDARY: &str = "pdfdesk-test-boundary";

    struct FakeProcessor;

    #[async_trait]
    impl CheckoutProcessor for FakeProcessor {
        async fn create_checkout_session(
            &self,
            request: &CheckoutRequest,
        ) -> pdfdesk_payments::Result<CheckoutSession> {
            Ok(CheckoutSession {
                id: "cs_test_1".into(),
                checkout_url: "https://checkout.stripe.com/c/pay/cs_test_1".into(),
                customer_email: request.customer_email.clone(),
            })
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct TestApp {
        router: Router,
        accounts: Arc<MemoryAccountStore>,
        storage: Arc<MemoryObjectStore>,
    }

    fn app_with(payments: bool, trust_success_redirect: bool) -> TestApp {
        let accounts = Arc::new(MemoryAccountStore::new());
        let store: Arc<dyn AccountStore> = accounts.clone();
        let storage = Arc::new(MemoryObjectStore::new(BASE_URL));

        let payments = payments.then(|| {
            let config = ReconcilerConfig {
                trust_success_redirect,
                ..ReconcilerConfig::for_base_url(BASE_URL)
            };
            Arc::new(PaymentReconciler::new(
                store.clone(),
                Arc::new(FakeProcessor),
                SignatureVerifier::new(WEBHOOK_SECRET),
                config,
            ))
        });

        let state = AppState {
            accounts: store,
            documents: Arc::new(LopdfService::new()),
            storage: storage.clone(),
            payments,
            sessions: SessionSigner::new("session-secret"),
            policy: PlanPolicy::default(),
        };

        TestApp {
            router: router(state, 10 * 1024 * 1024),
            accounts,
            storage,
        }
    }

    fn app() -> TestApp {
        app_with(true, true)
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        /// Sign in and return the `Cookie` header value
        async fn login(&self, email: &str) -> String {
            let request = Request::post("/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::json!({ "email": email }).to_string()))
                .unwrap();
            let response = self.send(request).await;
            assert_eq!(response.status(), StatusCode::OK);

            let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
            set_cookie.split(';').next().unwrap().to_string()
        }

        async fn upload(&self, uri: &str, cookie: &str, field: &str, files: &[Vec<u8>]) -> Response {
            let request = Request::post(uri)
                .header(header::COOKIE, cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(field, files)))
                .unwrap();
            self.send(request).await
        }

        async fn plan_of(&self, email: &str) -> Option<Plan> {
            self.accounts.get(email).await.unwrap().map(|account| account.plan)
        }

        async fn webhook(&self, payload: &[u8], signature: &str) -> Response {
            let request = Request::post("/webhook")
                .header("stripe-signature", signature)
                .body(Body::from(payload.to_vec()))
                .unwrap();
            self.send(request).await
        }
    }

    fn multipart_body(field: &str, files: &[Vec<u8>]) -> Vec<u8> {
        let mut body = Vec::new();
        for (i, file) in files.iter().enumerate() {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                     filename=\"doc{i}.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(file);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn completed_event(email: &str) -> Vec<u8> {
        serde_json::json!({
            "id": "evt_test_1",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_test_1", "customer_email": email, "payment_status": "paid"}}
        })
        .to_string()
        .into_bytes()
    }

    fn sign(payload: &[u8]) -> String {
        SignatureVerifier::new(WEBHOOK_SECRET)
            .sign(payload, unix_now())
            .unwrap()
    }

    fn unix_now() -> i64 {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap();
        i64::try_from(since_epoch.as_secs()).unwrap()
    }

    /// Path portion of a memory-store URL
    fn path_of(url: &str) -> &str {
        url.strip_prefix(BASE_URL).unwrap()
    }

    fn documents(n: usize) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| pdf_with_pages(&[format!("document {i}").as_str()]))
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let response = app.send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["stripe_configured"], true);
        assert_eq!(json["storage"], "memory");
    }

    #[tokio::test]
    async fn test_login_and_account() {
        let app = app();
        let cookie = app.login("  Reader@Example.com ").await;

        let request = Request::get("/account")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let json = body_json(app.send(request).await).await;
        assert_eq!(json["email"], "reader@example.com");
        assert_eq!(json["plan"], "free");
    }

    #[tokio::test]
    async fn test_invalid_login_email() {
        let app = app();
        let request = Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email": "not-an-email"}"#))
            .unwrap();
        assert_eq!(app.send(request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_requests_without_session_are_unauthorized() {
        let app = app();

        let response = app.upload("/merge", "", "pdfs", &documents(2)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let forged = format!("pdfdesk_session={}.00", "61406578616d706c652e636f6d");
        let response = app.upload("/merge", &forged, "pdfs", &documents(2)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.accounts.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_free_merge_limit() {
        let app = app();
        let cookie = app.login("free@example.com").await;

        let response = app.upload("/merge", &cookie, "pdfs", &documents(4)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(text, "Free users can merge max 3 PDFs. Upgrade to Premium!");

        let inputs = documents(3);
        let response = app.upload("/merge", &cookie, "pdfs", &inputs).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let file_url = json["file_url"].as_str().unwrap();
        assert!(file_url.starts_with(&format!("{BASE_URL}/files/merge/")));

        // The stored result is the three inputs in order
        let response = app
            .send(Request::get(path_of(file_url)).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let merged = body_bytes(response).await;
        let expected: Vec<Vec<u8>> = inputs.iter().flat_map(|doc| page_contents(doc)).collect();
        assert_eq!(page_contents(&merged), expected);

        assert_eq!(app.plan_of("free@example.com").await, Some(Plan::Free));
    }

    #[tokio::test]
    async fn test_webhook_upgrade_is_idempotent_and_lifts_limit() {
        let app = app();
        let cookie = app.login("buyer@example.com").await;

        let payload = completed_event("buyer@example.com");
        let response = app.webhook(&payload, &sign(&payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Premium));

        // Replay
        let response = app.webhook(&payload, &sign(&payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Premium));

        let response = app.upload("/merge", &cookie, "pdfs", &documents(5)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_bad_signature_rejected() {
        let app = app();
        app.login("buyer@example.com").await;

        let payload = completed_event("buyer@example.com");
        let signature = sign(&payload);
        let mut tampered = payload.clone();
        let last = tampered.len() - 2;
        tampered[last] ^= 0x01;

        let response = app.webhook(&tampered, &signature).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::post("/webhook").body(Body::from(payload)).unwrap();
        assert_eq!(app.send(request).await.status(), StatusCode::BAD_REQUEST);

        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Free));
    }

    #[tokio::test]
    async fn test_webhook_unknown_account_acknowledged() {
        let app = app();

        let payload = completed_event("stranger@example.com");
        let response = app.webhook(&payload, &sign(&payload)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.accounts.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_split_one_url_per_page() {
        let app = app();
        let cookie = app.login("reader@example.com").await;
        let document = pdf_with_pages(&["one", "two", "three"]);

        let response = app.upload("/split", &cookie, "pdf", &[document.clone()]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let urls: Vec<&str> = json["split_files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|url| url.as_str().unwrap())
            .collect();
        assert_eq!(urls.len(), 3);

        let originals = page_contents(&document);
        for (url, original) in urls.iter().zip(originals) {
            let response = app
                .send(Request::get(path_of(url)).body(Body::empty()).unwrap())
                .await;
            let page = body_bytes(response).await;
            assert_eq!(page_contents(&page), vec![original]);
        }
    }

    #[tokio::test]
    async fn test_compress_returns_stored_copy() {
        let app = app();
        let cookie = app.login("reader@example.com").await;
        let document = pdf_with_pages(&["same"]);

        let response = app.upload("/compress", &cookie, "pdf", &[document.clone()]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let url = json["compressed_file"].as_str().unwrap();

        let response = app
            .send(Request::get(path_of(url)).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(body_bytes(response).await, document);
    }

    #[tokio::test]
    async fn test_files_served_with_stored_content_type() {
        let app = app();
        let stored = app
            .storage
            .put("notes/abc/readme.txt", b"hello".to_vec(), "text/plain")
            .await
            .unwrap();

        let response = app
            .send(Request::get(path_of(&stored.url)).body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body_bytes(response).await, b"hello");
    }

    #[tokio::test]
    async fn test_bad_uploads() {
        let app = app();
        let cookie = app.login("reader@example.com").await;

        let response = app
            .upload("/split", &cookie, "pdf", &[b"not a pdf".to_vec()])
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_DOCUMENT");

        let response = app.upload("/merge", &cookie, "other", &documents(2)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.upload("/compress", &cookie, "pdf", &documents(2)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_checkout_and_success_redirect() {
        let app = app();
        let cookie = app.login("buyer@example.com").await;

        let request = Request::post("/create-checkout-session")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["url"],
            "https://checkout.stripe.com/c/pay/cs_test_1"
        );
        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Free));

        let request = Request::get("/cancel").body(Body::empty()).unwrap();
        assert_eq!(app.send(request).await.status(), StatusCode::OK);
        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Free));

        let request = Request::get("/success")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Premium));
    }

    #[tokio::test]
    async fn test_untrusted_success_redirect_waits_for_webhook() {
        let app = app_with(true, false);
        let cookie = app.login("buyer@example.com").await;

        let request = Request::get("/success")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.status(), StatusCode::OK);
        assert_eq!(app.plan_of("buyer@example.com").await, Some(Plan::Free));
    }

    #[tokio::test]
    async fn test_payments_disabled() {
        let app = app_with(false, true);
        let cookie = app.login("buyer@example.com").await;

        let request = Request::post("/create-checkout-session")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["code"], "PAYMENTS_DISABLED");

        let payload = completed_event("buyer@example.com");
        let response = app.webhook(&payload, "t=1,v1=00").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let app = app();
        let request = Request::get("/files/merge/nope/merged.pdf")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.send(request).await.status(), StatusCode::NOT_FOUND);
    }
}
