//! In-memory object and media stores for tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use auth::{UserStore, UserSummary};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::models::{EngagementCounts, MediaObject, MediaPost, NewMediaObject};
use crate::repository::MediaStore;
use crate::store::{ObjectMetadata, ObjectStore};

pub const TEST_CDN_DOMAIN: &str = "https://cdn.test";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

#[derive(Default)]
struct ObjectLog {
    objects: HashMap<String, StoredObject>,
    puts: Vec<String>,
    deletes: Vec<String>,
}

/// Object store that keeps objects in a map and records every call
#[derive(Default)]
pub struct InMemoryObjectStore {
    log: Mutex<ObjectLog>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.lock().objects.get(key).cloned()
    }

    /// Keys of every attempted put, in call order
    pub fn put_keys(&self) -> Vec<String> {
        self.lock().puts.clone()
    }

    /// Keys of every attempted delete, in call order
    pub fn deleted_keys(&self) -> Vec<String> {
        self.lock().deletes.clone()
    }

    pub fn put_count(&self) -> usize {
        self.lock().puts.len()
    }

    pub fn delete_count(&self) -> usize {
        self.lock().deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, ObjectLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let mut log = self.lock();
        log.puts.push(key.to_string());

        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "simulated put failure".to_string(),
            });
        }

        log.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut log = self.lock();
        log.deletes.push(key.to_string());

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Delete {
                key: key.to_string(),
                message: "simulated delete failure".to_string(),
            });
        }

        log.objects.remove(key);
        Ok(())
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let expires_at = (Utc::now() + ttl).timestamp();
        Ok(format!(
            "{}/{}?Expires={}&Signature=test&Key-Pair-Id=TEST",
            TEST_CDN_DOMAIN,
            urlencoding::encode(key),
            expires_at
        ))
    }
}

/// Media store backed by a vector; authors are looked up in a user store
/// when one is attached
#[derive(Default)]
pub struct InMemoryMediaStore {
    records: Mutex<Vec<MediaObject>>,
    counts: Mutex<HashMap<Uuid, EngagementCounts>>,
    users: Option<Arc<dyn UserStore>>,
    fail_creates: AtomicBool,
    fail_lists: AtomicBool,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Arc<dyn UserStore>) -> Self {
        Self {
            users: Some(users),
            ..Self::default()
        }
    }

    pub fn fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn set_counts(&self, media_id: Uuid, counts: EngagementCounts) {
        lock(&self.counts).insert(media_id, counts);
    }

    pub fn records(&self) -> Vec<MediaObject> {
        lock(&self.records).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn author(&self, owner_id: Uuid) -> Result<UserSummary> {
        let user = match &self.users {
            Some(users) => users.find_by_id(owner_id).await?,
            None => None,
        };

        Ok(user.as_ref().map(UserSummary::from).unwrap_or(UserSummary {
            id: owner_id,
            username: String::new(),
            name: None,
            avatar: None,
        }))
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn create(&self, new_media: &NewMediaObject) -> Result<MediaObject> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated metadata store failure"));
        }

        let media = MediaObject {
            id: Uuid::new_v4(),
            storage_key: new_media.storage_key.clone(),
            caption: new_media.caption.clone(),
            slug: new_media.slug.clone(),
            media_kind: new_media.media_kind,
            file_size: new_media.file_size,
            mime_type: new_media.mime_type.clone(),
            published: true,
            owner_id: new_media.owner_id,
            created_at: Utc::now(),
        };
        lock(&self.records).push(media.clone());
        Ok(media)
    }

    async fn list_published(&self) -> Result<Vec<MediaPost>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated metadata store failure"));
        }

        let mut records = self.records();
        records.retain(|m| m.published);
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut posts = Vec::with_capacity(records.len());
        for media in records {
            let author = self.author(media.owner_id).await?;
            let counts = lock(&self.counts).get(&media.id).copied().unwrap_or_default();
            posts.push(MediaPost {
                media,
                author,
                counts,
            });
        }
        Ok(posts)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
