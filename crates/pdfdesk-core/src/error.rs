//! Error Types

use thiserror::Error;

/// Result type alias for account operations
pub type Result<T> = std::result::Result<T, AccountError>;

/// Account store errors
#[derive(Error, Debug)]
pub enum AccountError {
    /// Identity could not be used as an account key
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Persisted plan value is not a known plan
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    /// Backing store unavailable or failed mid-operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AccountError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Database(_))
    }

    /// Convert to a user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "Please provide a valid email address.",
            Self::UnknownPlan(_) => "Your account is in an unexpected state.",
            Self::Storage(_) | Self::Database(_) => {
                "Account service is temporarily unavailable. Please try again."
            }
        }
    }
}
