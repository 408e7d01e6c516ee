//! Storage Error Types

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Store configuration is incomplete or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend call failed
    #[error("S3 SDK error: {0}")]
    Sdk(String),

    /// Backend call did not complete in time
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StorageError {
    /// Transient errors are safe to retry
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Sdk(_) | Self::Timeout(_))
    }
}
