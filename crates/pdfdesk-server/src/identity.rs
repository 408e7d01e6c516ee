//! Caller Identity
//!
//! A signed cookie names the caller's email:
//!
//! ```text
//! pdfdesk_session=<hex(email)>.<hex(HMAC-SHA256(secret, email))>
//! ```
//!
//! The [`Identity`] extractor verifies it and loads the account on every
//! request, so handlers see the plan as it is right now.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use pdfdesk_core::Plan;

use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "pdfdesk_session";

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct SessionSigner {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    /// Signer with a secret that lives only as long as this process
    pub fn ephemeral() -> Self {
        let secret = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        Self::new(secret)
    }

    fn mac(&self, email: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(email.as_bytes());
        mac
    }

    pub fn token(&self, email: &str) -> String {
        let signature = self.mac(email).finalize().into_bytes();
        format!("{}.{}", hex::encode(email), hex::encode(signature))
    }

    /// Email named by a valid token
    pub fn verify(&self, token: &str) -> Option<String> {
        let (email_hex, signature_hex) = token.split_once('.')?;
        let email = String::from_utf8(hex::decode(email_hex).ok()?).ok()?;
        let signature = hex::decode(signature_hex).ok()?;

        self.mac(&email).verify_slice(&signature).ok()?;
        Some(email)
    }

    /// `Set-Cookie` value establishing a session for `email`
    pub fn cookie(&self, email: &str) -> String {
        format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.token(email)
        )
    }
}

/// Session token from the request's cookies, if any
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find_map(|(name, value)| (name == SESSION_COOKIE).then_some(value))
}

/// The signed-in caller and their plan at the time of the request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub plan: Plan,
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let email = session_token(&parts.headers)
            .and_then(|token| state.sessions.verify(token))
            .ok_or(AppError::Unauthenticated)?;

        let account = state.accounts.get_or_create(&email).await?;

        Ok(Self {
            email: account.email,
            plan: account.plan,
        })
    }
}
