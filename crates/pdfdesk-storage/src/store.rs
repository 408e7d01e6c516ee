//! Object Store Abstraction

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, StorageError};

/// A written object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key within the store
    pub key: String,

    /// URL the caller can fetch the object from
    pub url: String,

    /// Size in bytes
    pub size: usize,
}

/// An object read back from a store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredData {
    pub data: Vec<u8>,

    /// Content type recorded when the object was written
    pub content_type: String,
}

/// Object store trait (Strategy pattern)
///
/// `put` returns only after the object is durably written.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object and return its retrieval reference
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject>;

    /// Read an object back, `None` if it does not exist
    async fn get(&self, key: &str) -> Result<Option<StoredData>>;

    /// Remove an object; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Backend name (for logs and health output)
    fn name(&self) -> &str;
}

/// Build a unique key: `{operation}/{uuid}/{file_name}`
pub fn object_key(operation: &str, file_name: &str) -> String {
    format!("{operation}/{}/{file_name}", uuid::Uuid::new_v4().simple())
}

/// Bound a backend call, mapping expiry to [`StorageError::Timeout`]
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| StorageError::Timeout(timeout))?
}
