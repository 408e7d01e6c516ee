//! Error Types for Document Operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Error, Debug)]
pub enum DocumentError {
    /// Input is not a well-formed PDF (or no input was given)
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A produced document could not be serialized
    #[error("Failed to write document: {0}")]
    Write(String),
}

impl DocumentError {
    pub const fn is_retryable(&self) -> bool {
        false
    }

    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidDocument(_) => "One of the uploaded files is not a valid PDF.",
            Self::Write(_) => "The document could not be produced.",
        }
    }
}

impl From<lopdf::Error> for DocumentError {
    fn from(err: lopdf::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}
