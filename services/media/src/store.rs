//! Object store adapter
//!
//! Writes uploaded bytes to a private S3 bucket and hands out time-limited
//! CDN URLs for reading them back.

use async_trait::async_trait;
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cdn::CloudFrontSigner;
use crate::error::{StorageError, StorageResult};

/// User metadata attached to every stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub user_id: Uuid,
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ObjectMetadata {
    /// Header-safe pairs; S3 user metadata must be US-ASCII, so the client
    /// filename is percent-encoded
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            ("userId", self.user_id.to_string()),
            (
                "originalName",
                urlencoding::encode(&self.original_name).into_owned(),
            ),
            ("uploadedAt", self.uploaded_at.to_rfc3339()),
        ]
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// Remove an object; deleting a missing key succeeds
    async fn delete(&self, key: &str) -> StorageResult<()>;

    fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String>;
}

/// Build a storage key: `{millis}-{user_id}-{uuid}[.ext]`
///
/// The random component makes keys unique regardless of filename or clock;
/// the client's filename only contributes a sanitized extension.
pub fn storage_key(uploaded_at: DateTime<Utc>, user_id: Uuid, file_name: &str) -> String {
    let base = format!(
        "{}-{}-{}",
        uploaded_at.timestamp_millis(),
        user_id,
        Uuid::new_v4().simple()
    );

    match file_extension(file_name) {
        Some(ext) => format!("{}.{}", base, ext),
        None => base,
    }
}

/// Lower-cased extension when it is short and alphanumeric
fn file_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Storage key with its final extension removed
pub fn slug_for_key(key: &str) -> String {
    match key.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => key.to_string(),
    }
}

/// S3 bucket fronted by CloudFront
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    signer: CloudFrontSigner,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>, signer: CloudFrontSigner) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            signer,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let size_bytes = data.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type);

        for (name, value) in metadata.pairs() {
            request = request.metadata(name, value);
        }

        request.send().await.map_err(|e| StorageError::Upload {
            key: key.to_string(),
            message: DisplayErrorContext(&e).to_string(),
        })?;

        info!(
            bucket = %self.bucket,
            storage_key = %key,
            size_bytes = size_bytes,
            content_type = %content_type,
            "Object stored"
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        info!(bucket = %self.bucket, storage_key = %key, "Object deleted");
        Ok(())
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let expires_at = (Utc::now() + ttl).timestamp();
        debug!(storage_key = %key, expires_at = expires_at, "Signing CDN URL");
        self.signer.sign(key, expires_at)
    }
}
