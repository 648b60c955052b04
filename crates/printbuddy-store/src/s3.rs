use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;

use crate::{ObjectStore, StoreConfig, StoreError};

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Store {
    bucket: Box<Bucket>,
    /// Prefix of every object URL, without a trailing slash.
    public_base: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("public_base", &self.public_base)
            .finish_non_exhaustive()
    }
}

impl S3Store {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let region_name = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.into());

        let credentials = Credentials::new(
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Internal(format!("credentials: {e}")))?;

        let bucket_name = config
            .bucket
            .as_deref()
            .ok_or_else(|| StoreError::Internal("bucket name required".into()))?;

        // A custom endpoint (MinIO, Garage, LocalStack) is addressed
        // path-style; AWS itself gets virtual-hosted URLs.
        let (region, public_base, path_style) = match config.endpoint_url.as_deref() {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                (
                    Region::Custom {
                        region: region_name.clone(),
                        endpoint: endpoint.to_string(),
                    },
                    format!("{endpoint}/{bucket_name}"),
                    true,
                )
            }
            None => {
                let region: Region = region_name
                    .parse()
                    .map_err(|e| StoreError::Internal(format!("region {region_name}: {e}")))?;
                (
                    region,
                    format!("https://{bucket_name}.s3.{region_name}.amazonaws.com"),
                    false,
                )
            }
        };

        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StoreError::Internal(format!("bucket: {e}")))?;
        if path_style {
            bucket.set_path_style();
        }

        Ok(Self {
            bucket,
            public_base,
        })
    }
}

fn map_s3_error(e: S3Error) -> StoreError {
    StoreError::Internal(format!("s3: {e}"))
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(map_s3_error)?;
        if response.status_code() >= 300 {
            return Err(StoreError::Internal(format!(
                "s3 put {}: status {}",
                key,
                response.status_code()
            )));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let response = self.bucket.get_object(key).await.map_err(map_s3_error)?;
        if response.status_code() == 404 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if response.status_code() >= 400 {
            return Err(StoreError::Internal(format!(
                "s3 get {}: status {}",
                key,
                response.status_code()
            )));
        }
        Ok(Bytes::from(response.to_vec()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let response = self.bucket.get_object(key).await.map_err(map_s3_error)?;
        Ok(response.status_code() != 404)
    }

    fn locator(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}
