//! # pdfdesk-storage
//!
//! Durable storage for produced documents.
//!
//! ## Backends
//!
//! - **S3** (`S3ObjectStore`): any S3-compatible service, presigned GET URLs
//! - **Memory** (`MemoryObjectStore`): development and tests, served by `/files`,
//!   holding a bounded number of objects
//!
//! Every S3 call is bounded by a timeout and surfaces expiry as
//! [`StorageError::Timeout`].

pub mod error;
pub mod memory;
pub mod s3;
pub mod store;

pub use error::{Result, StorageError};
pub use memory::MemoryObjectStore;
pub use s3::{S3Config, S3ObjectStore};
pub use store::{object_key, ObjectStore, StoredData, StoredObject};
