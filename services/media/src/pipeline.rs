//! Upload orchestration
//!
//! validate -> put -> create record -> increment quota. The storage write
//! always happens before the record exists; if the record cannot be
//! created the object is deleted again. A failed quota increment is
//! logged and left for out-of-band reconciliation.

use auth::{User, UserStore, UserSummary};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::error::UploadError;
use crate::models::{CandidateFile, EngagementCounts, NewMediaObject, UploadedMedia};
use crate::repository::MediaStore;
use crate::store::{ObjectMetadata, ObjectStore, slug_for_key, storage_key};
use crate::validator::{UploadPolicy, normalize_content_type};

#[derive(Clone)]
pub struct UploadPipeline {
    policy: UploadPolicy,
    objects: Arc<dyn ObjectStore>,
    media: Arc<dyn MediaStore>,
    users: Arc<dyn UserStore>,
}

impl UploadPipeline {
    pub fn new(
        policy: UploadPolicy,
        objects: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            policy,
            objects,
            media,
            users,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Run one upload for an authenticated user
    ///
    /// `user` must be freshly loaded; its `upload_count` is the quota input.
    #[instrument(
        name = "upload",
        skip_all,
        fields(user_id = %user.id, size_bytes = file.size(), content_type = %file.content_type)
    )]
    pub async fn upload(
        &self,
        user: &User,
        file: CandidateFile,
        caption: Option<String>,
    ) -> Result<UploadedMedia, UploadError> {
        let media_kind = self
            .policy
            .validate(&file, user.upload_count)
            .inspect_err(|e| warn!(error = %e, upload_count = user.upload_count, "Upload rejected"))?;

        let uploaded_at = Utc::now();
        let key = storage_key(uploaded_at, user.id, &file.file_name);
        let mime_type = normalize_content_type(&file.content_type);
        let file_size = file.size() as i64;
        let metadata = ObjectMetadata {
            user_id: user.id,
            original_name: file.file_name,
            uploaded_at,
        };

        self.objects
            .put(&key, file.data, &mime_type, &metadata)
            .await
            .inspect_err(|e| error!(error = %e, storage_key = %key, "Object upload failed"))?;

        let new_media = NewMediaObject {
            slug: slug_for_key(&key),
            storage_key: key.clone(),
            media_kind,
            file_size,
            mime_type,
            owner_id: user.id,
            caption: caption.map(|c| c.trim().to_string()).unwrap_or_default(),
        };

        let media = match self.media.create(&new_media).await {
            Ok(media) => media,
            Err(e) => {
                error!(error = %e, storage_key = %key, "Failed to record upload; rolling back object");
                self.roll_back(&key).await;
                return Err(UploadError::MetadataCommit(e));
            }
        };

        if let Err(e) = self.users.increment_upload_count(user.id).await {
            error!(
                error = %e,
                media_id = %media.id,
                "Upload recorded but upload count not incremented; needs reconciliation"
            );
        }

        info!(
            media_id = %media.id,
            storage_key = %key,
            media_kind = %media_kind,
            "Upload completed"
        );

        Ok(UploadedMedia {
            media,
            author: UserSummary::from(user),
            counts: EngagementCounts::default(),
        })
    }

    async fn roll_back(&self, key: &str) {
        match self.objects.delete(key).await {
            Ok(()) => info!(storage_key = %key, "Rolled back stored object"),
            Err(e) => error!(error = %e, storage_key = %key, "Rollback delete failed; object orphaned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::testing::{InMemoryMediaStore, InMemoryObjectStore};
    use crate::validator::MAX_IMAGE_SIZE;
    use auth::testing::InMemoryUserStore;

    struct Harness {
        pipeline: UploadPipeline,
        objects: Arc<InMemoryObjectStore>,
        media: Arc<InMemoryMediaStore>,
        users: Arc<InMemoryUserStore>,
    }

    fn harness() -> Harness {
        let objects = Arc::new(InMemoryObjectStore::new());
        let media = Arc::new(InMemoryMediaStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let pipeline = UploadPipeline::new(
            UploadPolicy::default(),
            objects.clone(),
            media.clone(),
            users.clone(),
        );
        Harness {
            pipeline,
            objects,
            media,
            users,
        }
    }

    fn jpeg(size: usize) -> CandidateFile {
        CandidateFile {
            file_name: "sunset.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xff; size],
        }
    }

    #[tokio::test]
    async fn test_sunset_upload() {
        let h = harness();
        let user = h.users.insert_user("ada", 0);

        let uploaded = h
            .pipeline
            .upload(&user, jpeg(500 * 1024), Some("sunset".to_string()))
            .await
            .unwrap();

        assert_eq!(uploaded.media.media_kind, MediaKind::Image);
        assert_eq!(uploaded.media.caption, "sunset");
        assert_eq!(uploaded.media.owner_id, user.id);
        assert_eq!(uploaded.media.file_size, 500 * 1024);
        assert_eq!(uploaded.media.mime_type, "image/jpeg");
        assert!(uploaded.media.published);
        assert_eq!(uploaded.author.id, user.id);
        assert_eq!(uploaded.counts, EngagementCounts::default());
        assert_eq!(h.users.upload_count(user.id), Some(1));

        let stored = h.objects.object(&uploaded.media.storage_key).unwrap();
        assert_eq!(stored.content_type, "image/jpeg");
        assert_eq!(stored.metadata.user_id, user.id);
        assert_eq!(stored.metadata.original_name, "sunset.jpg");
        assert_eq!(
            uploaded.media.slug,
            uploaded.media.storage_key.trim_end_matches(".jpg")
        );
        assert_eq!(h.media.len(), 1);
    }

    #[tokio::test]
    async fn test_quota_reached_writes_nothing() {
        let h = harness();
        let user = h.users.insert_user("ada", 5);

        let result = h.pipeline.upload(&user, jpeg(10), None).await;

        assert!(matches!(result, Err(UploadError::QuotaExceeded { limit: 5 })));
        assert_eq!(h.objects.put_count(), 0);
        assert_eq!(h.media.len(), 0);
        assert_eq!(h.users.upload_count(user.id), Some(5));
    }

    #[tokio::test]
    async fn test_invalid_files_never_reach_storage() {
        let h = harness();
        let user = h.users.insert_user("ada", 0);

        let pdf = CandidateFile {
            file_name: "paper.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: vec![1; 10],
        };
        assert!(matches!(
            h.pipeline.upload(&user, pdf, None).await,
            Err(UploadError::UnsupportedType { .. })
        ));

        assert!(matches!(
            h.pipeline.upload(&user, jpeg(MAX_IMAGE_SIZE + 1), None).await,
            Err(UploadError::FileTooLarge {
                kind: MediaKind::Image,
                ..
            })
        ));

        assert_eq!(h.objects.put_count(), 0);
        assert_eq!(h.users.upload_count(user.id), Some(0));
    }

    #[tokio::test]
    async fn test_storage_failure_stops_before_record() {
        let h = harness();
        let user = h.users.insert_user("ada", 0);
        h.objects.fail_puts(true);

        let result = h.pipeline.upload(&user, jpeg(10), None).await;

        assert!(matches!(result, Err(UploadError::Storage(_))));
        assert_eq!(h.media.len(), 0);
        assert_eq!(h.objects.delete_count(), 0);
        assert_eq!(h.users.upload_count(user.id), Some(0));
    }

    #[tokio::test]
    async fn test_record_failure_deletes_object() {
        let h = harness();
        let user = h.users.insert_user("ada", 0);
        h.media.fail_creates(true);

        let result = h.pipeline.upload(&user, jpeg(10), None).await;

        assert!(matches!(result, Err(UploadError::MetadataCommit(_))));
        assert_eq!(h.objects.put_count(), 1);
        assert_eq!(h.objects.deleted_keys(), h.objects.put_keys());
        assert!(h.objects.is_empty());
        assert_eq!(h.users.upload_count(user.id), Some(0));
    }

    #[tokio::test]
    async fn test_record_failure_is_reported_even_when_rollback_fails() {
        let h = harness();
        let user = h.users.insert_user("ada", 0);
        h.media.fail_creates(true);
        h.objects.fail_deletes(true);

        let result = h.pipeline.upload(&user, jpeg(10), None).await;

        assert!(matches!(result, Err(UploadError::MetadataCommit(_))));
        assert_eq!(h.objects.delete_count(), 1);
    }

    #[tokio::test]
    async fn test_increment_failure_still_succeeds() {
        let h = harness();
        let user = h.users.insert_user("ada", 2);
        h.users.fail_increments(true);

        let uploaded = h.pipeline.upload(&user, jpeg(10), None).await.unwrap();

        assert_eq!(h.media.len(), 1);
        assert!(h.objects.object(&uploaded.media.storage_key).is_some());
        assert_eq!(h.users.upload_count(user.id), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_at_four_both_succeed() {
        let h = harness();
        let user = h.users.insert_user("ada", 4);

        // Both requests resolved the user before either incremented
        let first = user.clone();
        let second = user.clone();
        let (a, b) = tokio::join!(
            h.pipeline.upload(&first, jpeg(10), None),
            h.pipeline.upload(&second, jpeg(10), None)
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(h.users.upload_count(user.id), Some(6));
        assert_eq!(h.objects.put_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_caption_is_empty() {
        let h = harness();
        let user = h.users.insert_user("ada", 0);

        let uploaded = h.pipeline.upload(&user, jpeg(10), None).await.unwrap();

        assert_eq!(uploaded.media.caption, "");
    }
}
