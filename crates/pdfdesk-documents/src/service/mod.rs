//! Document Service
//!
//! The operations the gateway dispatches to once a request is allowed.

pub(crate) mod pdf;

pub use pdf::LopdfService;

use crate::error::Result;

/// Document service trait (Strategy pattern)
///
/// Implementations are blocking and CPU bound; async callers should run
/// them on a blocking thread. Implementations hold no mutable state, so one
/// instance may serve concurrent calls.
pub trait DocumentService: Send + Sync {
    /// Concatenate the pages of `documents` in input order
    fn merge(&self, documents: &[Vec<u8>]) -> Result<Vec<u8>>;

    /// One single-page document per page, in page order
    fn split(&self, document: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Reduce the document size
    ///
    /// Returns the input unchanged once it is known to be well formed.
    fn compress(&self, document: &[u8]) -> Result<Vec<u8>>;

    /// Number of pages in a document
    fn page_count(&self, document: &[u8]) -> Result<usize>;

    /// Service name (for logs)
    fn name(&self) -> &str;
}
