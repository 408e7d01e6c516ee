//! # pdfdesk-documents
//!
//! Merge, split and compress operations on binary PDF documents.
//!
//! ```text
//! merge:    [A(1p), B(2p)] ──▶ AB(3p)          pages in input order
//! split:    AB(3p)         ──▶ [1p, 1p, 1p]    one document per page
//! compress: A              ──▶ A               validated passthrough
//! ```
//!
//! All operations reject malformed input with
//! [`DocumentError::InvalidDocument`].

pub mod error;
pub mod service;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use error::{DocumentError, Result};
pub use service::{DocumentService, LopdfService};
