//! Server Configuration
//!
//! Read once at startup from the environment (after `.env` is loaded).

use std::time::Duration;

use pdfdesk_core::FREE_MERGE_LIMIT;
use pdfdesk_payments::DEFAULT_TOLERANCE_SECS;
use pdfdesk_storage::{memory::DEFAULT_MAX_OBJECTS, S3Config};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,

    /// External base URL used for checkout callbacks and served files
    pub public_base_url: String,

    /// SQLite URL; `None` keeps accounts in memory
    pub database_url: Option<String>,

    /// Object storage; `None` keeps documents in memory
    pub s3: Option<S3Config>,

    /// Objects the in-memory store keeps before evicting the oldest
    pub memory_max_objects: usize,

    /// Session cookie signing secret; `None` means generate one per process
    pub session_secret: Option<String>,

    pub upstream_timeout: Duration,
    pub trust_success_redirect: bool,

    /// Accepted age (and clock skew) of a signed webhook
    pub webhook_tolerance_secs: u64,

    pub free_merge_limit: usize,
    pub max_upload_bytes: usize,

    /// `RUST_LOG` directives, read together with the rest of `.env`
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let parsed = |name: &str| non_empty(name).and_then(|v| v.trim().parse::<u64>().ok());

        let upstream_timeout = Duration::from_secs(parsed("UPSTREAM_TIMEOUT_SECS").unwrap_or(10));
        let trust_success_redirect = non_empty("TRUST_SUCCESS_REDIRECT")
            .is_none_or(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"));

        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            public_base_url: non_empty("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            database_url: non_empty("DATABASE_URL"),
            s3: S3Config::from_lookup(&lookup),
            memory_max_objects: parsed("MEMORY_MAX_OBJECTS")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(DEFAULT_MAX_OBJECTS),
            session_secret: non_empty("SESSION_SECRET"),
            upstream_timeout,
            trust_success_redirect,
            webhook_tolerance_secs: parsed("WEBHOOK_TOLERANCE_SECS").unwrap_or(DEFAULT_TOLERANCE_SECS),
            free_merge_limit: parsed("FREE_MERGE_LIMIT")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(FREE_MERGE_LIMIT),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES")
                .and_then(|v| usize::try_from(v).ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_filter: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
