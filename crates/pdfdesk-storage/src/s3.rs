//! S3-compatible Object Store
//!
//! Wraps the AWS SDK. Retrieval references are presigned GET URLs.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use std::time::Duration;

use crate::error::{Result, StorageError};
use crate::store::{bounded, ObjectStore, StoredData, StoredObject};

/// Served when an object was written without a content type
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// S3 store configuration
#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,

    /// Custom endpoint (MinIO, R2, ...). `None` uses AWS.
    pub endpoint: Option<String>,

    /// Static credentials. `None` uses the default AWS provider chain.
    pub access_key: Option<String>,
    pub secret_key: Option<String>,

    /// Lifetime of presigned retrieval URLs
    pub presign_expiry: Duration,

    /// Bound on every backend call
    pub timeout: Duration,
}

impl S3Config {
    /// Read `S3_*` variables; `None` when no bucket is configured
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `None` when no bucket is configured
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let bucket = lookup("S3_BUCKET").filter(|b| !b.is_empty())?;

        let presign_expiry = lookup("PRESIGN_EXPIRY_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600);
        let timeout = lookup("UPSTREAM_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Some(Self {
            bucket,
            region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            endpoint: lookup("S3_ENDPOINT").filter(|e| !e.is_empty()),
            access_key: lookup("S3_ACCESS_KEY"),
            secret_key: lookup("S3_SECRET_KEY"),
            presign_expiry: Duration::from_secs(presign_expiry),
            timeout: Duration::from_secs(timeout),
        })
    }
}

/// S3-compatible storage client
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    presign_expiry: Duration,
    timeout: Duration,
}

impl S3ObjectStore {
    /// Create a new S3 store from configuration
    pub async fn new(config: &S3Config) -> Result<Self> {
        let region = Region::new(config.region.clone());

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "pdfdesk");
                aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials)
            }
            (None, None) => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
            _ => {
                return Err(StorageError::Config(
                    "S3_ACCESS_KEY and S3_SECRET_KEY must be set together".into(),
                ));
            }
        };

        if let Some(endpoint) = &config.endpoint {
            // Path-style addressing is required by MinIO and most S3-compatible services
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 object store configured"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            presign_expiry: config.presign_expiry,
            timeout: config.timeout,
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn presigned_url(&self, key: &str) -> Result<String> {
        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| StorageError::Config(format!("Invalid presign expiry: {e}")))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Sdk(format!("Failed to presign {key}: {e}")))?;

        Ok(request.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        let size = data.len();

        bounded(self.timeout, async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| StorageError::Sdk(format!("Failed to put object {key}: {e}")))?;

            let url = self.presigned_url(key).await?;
            Ok(StoredObject {
                key: key.to_string(),
                url,
                size,
            })
        })
        .await
        .inspect(|_| tracing::debug!(bucket = %self.bucket, key = %key, size, "Stored object"))
    }

    async fn get(&self, key: &str) -> Result<Option<StoredData>> {
        bounded(self.timeout, async {
            let response = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(StorageError::Sdk(format!("Failed to get object {key}: {e}")));
                }
            };

            let content_type = response
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string();
            let data = response
                .body
                .collect()
                .await
                .map_err(|e| StorageError::Sdk(format!("Failed to read object body: {e}")))?
                .into_bytes()
                .to_vec();

            Ok(Some(StoredData { data, content_type }))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        bounded(self.timeout, async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| StorageError::Sdk(format!("Failed to delete object {key}: {e}")))?;
            Ok(())
        })
        .await
        .inspect(|()| tracing::debug!(bucket = %self.bucket, key = %key, "Deleted object"))
    }

    fn name(&self) -> &str {
        "s3"
    }
}
