//! Read path: published media with signed delivery URLs

use auth::UserSummary;
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::CatalogError;
use crate::models::{EngagementCounts, MediaObject};
use crate::repository::MediaStore;
use crate::store::ObjectStore;

/// Lifetime of URLs handed out by the read path
pub const SIGNED_URL_TTL_MINUTES: i64 = 10;

pub fn signed_url_ttl() -> Duration {
    Duration::minutes(SIGNED_URL_TTL_MINUTES)
}

/// A published media record whose `content` is a signed URL
#[derive(Debug, Clone, Serialize)]
pub struct PublishedMedia {
    #[serde(flatten)]
    pub media: MediaObject,
    pub author: UserSummary,
    #[serde(rename = "_count")]
    pub counts: EngagementCounts,
}

#[derive(Clone)]
pub struct MediaCatalog {
    media: Arc<dyn MediaStore>,
    objects: Arc<dyn ObjectStore>,
}

impl MediaCatalog {
    pub fn new(media: Arc<dyn MediaStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { media, objects }
    }

    /// Published media, newest first, with URLs valid for ten minutes
    pub async fn list_published(&self) -> Result<Vec<PublishedMedia>, CatalogError> {
        let posts = self
            .media
            .list_published()
            .await
            .map_err(CatalogError::Store)?;

        let ttl = signed_url_ttl();
        let published = posts
            .into_iter()
            .map(|post| -> Result<PublishedMedia, CatalogError> {
                let mut media = post.media;
                media.storage_key = self.objects.signed_url(&media.storage_key, ttl)?;
                Ok(PublishedMedia {
                    media,
                    author: post.author,
                    counts: post.counts,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = published.len(), "Listed published media");
        Ok(published)
    }
}
