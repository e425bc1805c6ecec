//! Photo Upload Adapter — puts profile photo blobs into object storage and
//! hands back a publicly resolvable URL.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use crate::errors::AppError;

/// Enforced by the route layer before the blob reaches this adapter.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// A photo as received from the profile-edit form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Object-storage seam for profile photos. Carried in the session manager
/// as `Arc<dyn PhotoStorage>`.
#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Uploads the blob and returns its public URL. No retry: any transport
    /// failure surfaces as an upload error.
    async fn upload_profile_photo(
        &self,
        external_id: &str,
        photo: &PhotoUpload,
    ) -> Result<String, AppError>;
}

/// Storage key for a profile photo. The timestamp keeps successive uploads
/// of the same file from colliding in caches.
fn photo_key(external_id: &str, timestamp_ms: i64, filename: &str) -> String {
    let safe_name = filename.replace(['/', '\\'], "_");
    format!("profile-photos/{external_id}/{timestamp_ms}-{safe_name}")
}

/// S3-compatible implementation (MinIO locally, AWS in production).
#[derive(Clone)]
pub struct S3PhotoStorage {
    s3: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3PhotoStorage {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String, public_base_url: String) -> Self {
        Self {
            s3,
            bucket,
            public_base_url,
        }
    }
}

#[async_trait]
impl PhotoStorage for S3PhotoStorage {
    async fn upload_profile_photo(
        &self,
        external_id: &str,
        photo: &PhotoUpload,
    ) -> Result<String, AppError> {
        let key = photo_key(external_id, Utc::now().timestamp_millis(), &photo.filename);

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(photo.data.to_vec()))
            .content_type(&photo.content_type)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("photo upload failed: {e}")))?;

        info!("Uploaded profile photo to s3://{}/{}", self.bucket, key);

        Ok(format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            self.bucket,
            key
        ))
    }
}
