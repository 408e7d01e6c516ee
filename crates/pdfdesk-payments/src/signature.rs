//! Webhook Signature Verification
//!
//! Stripe signs `"{t}.{raw body}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<unix seconds>,v1=<hex>[,v1=<hex>...]`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (and clock skew) accepted for a signed event, in seconds
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Verifies webhook signatures against a shared secret
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance_secs: u64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    fn mac(&self, timestamp: &str, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| PaymentError::Config(format!("Unusable webhook secret: {e}")))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    /// Verify against the current time
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<()> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify as if the current time were `now` (unix seconds)
    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<()> {
        let mut timestamp: Option<&str> = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| invalid("malformed signature header"))?;
            match key {
                "t" if timestamp.is_none() => timestamp = Some(value),
                "t" => return Err(invalid("duplicate timestamp")),
                "v1" => signatures.push(value),
                _ => {} // other schemes (e.g. v0) are not trusted
            }
        }

        let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
        let issued_at: i64 = timestamp
            .parse()
            .map_err(|_| invalid("timestamp is not a number"))?;

        // abs_diff cannot overflow for any pair of i64 timestamps
        if now.abs_diff(issued_at) > self.tolerance_secs {
            return Err(invalid("timestamp outside tolerance"));
        }

        if signatures.is_empty() {
            return Err(invalid("no v1 signature"));
        }

        for signature in signatures {
            let Ok(expected) = hex::decode(signature) else {
                continue;
            };
            // verify_slice compares in constant time
            if self.mac(timestamp, payload)?.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(invalid("no signature matches payload"))
    }

    /// Produce a header for `payload` signed at `timestamp`
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let digest = self
            .mac(&timestamp.to_string(), payload)?
            .finalize()
            .into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
    }
}

fn invalid(reason: &str) -> PaymentError {
    PaymentError::SignatureInvalid(reason.to_string())
}
