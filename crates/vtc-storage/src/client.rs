//! S3 client implementation.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Narrow storage capability the worker fetches and uploads through.
///
/// Tests substitute an in-memory fake; production uses [`S3Store`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object to a local file, returning the byte count
    /// written. Implementations verify the written size against the
    /// service-reported object size where available.
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64>;

    /// Upload a local file to an object key.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;
}

/// Compare the service-reported object size against the bytes actually
/// collected. An unreported or zero content length skips the check.
fn verify_length(expected: Option<i64>, actual: u64) -> StorageResult<()> {
    match expected {
        Some(expected) if expected > 0 && expected as u64 != actual => {
            Err(StorageError::Truncated {
                expected: expected as u64,
                actual,
            })
        }
        _ => Ok(()),
    }
}

/// S3 object storage client.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Create a client using the default provider chain for region
    /// and credentials.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64> {
        debug!("Downloading s3://{}/{} to {}", bucket, key, path.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(e.to_string())
                }
            })?;

        let expected = response.content_length();

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes();

        let actual = bytes.len() as u64;
        verify_length(expected, actual)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;

        info!(
            "Downloaded s3://{}/{} ({} bytes) to {}",
            bucket,
            key,
            actual,
            path.display()
        );
        Ok(actual)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} to s3://{}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to s3://{}/{}", path.display(), bucket, key);
        Ok(())
    }
}
