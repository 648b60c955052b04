mod local;
#[cfg(feature = "s3")]
mod s3;
pub mod stage;

pub use local::LocalStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;
pub use stage::{FileStager, StageError, UploadPolicy};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// A store for uploaded files keyed by slash-separated paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write (create or overwrite) an object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Read an object. Returns `StoreError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self.get(key).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The durable locator handed out for `key`: a path relative to the
    /// upload root for local storage, a URL for object storage.
    fn locator(&self, key: &str) -> String;
}

// -- Configuration --

/// Configuration for the object store backend.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// S3-compatible endpoint URL (e.g., "http://127.0.0.1:9000").
    /// When `None`, AWS itself is addressed through `region`.
    pub endpoint_url: Option<String>,
    /// S3 region (e.g., "ap-south-1").
    pub region: Option<String>,
    /// S3 bucket name.
    pub bucket: Option<String>,
    /// AWS access key ID.
    pub access_key_id: Option<String>,
    /// AWS secret access key.
    pub secret_access_key: Option<String>,
    /// Local filesystem root (used when S3 is not configured).
    pub local_data_dir: Option<String>,
}

impl StoreConfig {
    /// Build from environment variables.
    /// A bucket name plus credentials selects S3; otherwise uploads land on
    /// the local filesystem under `PRINTBUDDY_UPLOAD_DIR` (default: the
    /// working directory).
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("PRINTBUDDY_S3_ENDPOINT")
                .or_else(|_| std::env::var("AWS_ENDPOINT_URL"))
                .ok(),
            region: std::env::var("PRINTBUDDY_S3_REGION")
                .or_else(|_| std::env::var("AWS_REGION"))
                .ok(),
            bucket: std::env::var("PRINTBUDDY_S3_BUCKET")
                .or_else(|_| std::env::var("S3_BUCKET"))
                .ok(),
            access_key_id: std::env::var("PRINTBUDDY_S3_ACCESS_KEY_ID")
                .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_access_key: std::env::var("PRINTBUDDY_S3_SECRET_ACCESS_KEY")
                .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            local_data_dir: std::env::var("PRINTBUDDY_UPLOAD_DIR").ok(),
        }
    }

    /// Config for a local store rooted at `dir`.
    pub fn local(dir: impl Into<String>) -> Self {
        Self {
            local_data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    pub fn is_s3(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some() && self.bucket.is_some()
    }
}

// -- Factory --

/// Create an `ObjectStore` from configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    if config.is_s3() {
        #[cfg(feature = "s3")]
        {
            Ok(Arc::new(S3Store::new(config)?))
        }
        #[cfg(not(feature = "s3"))]
        {
            Err(StoreError::Internal(
                "S3 configuration detected but the 's3' feature is not enabled".into(),
            ))
        }
    } else {
        Ok(Arc::new(LocalStore::new(config)))
    }
}
