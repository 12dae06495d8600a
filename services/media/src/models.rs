use auth::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Classification of an accepted upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Capitalized name for user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file received from the client, not yet validated
///
/// `content_type` and `file_name` are as declared by the client.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl CandidateFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Values for a media record to be created
#[derive(Debug, Clone)]
pub struct NewMediaObject {
    pub storage_key: String,
    pub media_kind: MediaKind,
    pub file_size: i64,
    pub mime_type: String,
    pub owner_id: Uuid,
    pub caption: String,
    pub slug: String,
}

/// A persisted media record
///
/// Serialized with the field names clients already consume: the storage
/// key is `content`, the caption is `title`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaObject {
    pub id: Uuid,
    #[serde(rename = "content")]
    pub storage_key: String,
    #[serde(rename = "title")]
    pub caption: String,
    pub slug: String,
    #[serde(rename = "fileType")]
    pub media_kind: MediaKind,
    pub file_size: i64,
    pub mime_type: String,
    pub published: bool,
    #[serde(rename = "authorId")]
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Like and comment totals for a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub likes: i64,
    pub comments: i64,
}

/// A published media record joined with its owner, as stored
#[derive(Debug, Clone)]
pub struct MediaPost {
    pub media: MediaObject,
    pub author: UserSummary,
    pub counts: EngagementCounts,
}

/// A media record returned by the upload endpoint
///
/// Same shape as a listed post; a fresh upload has no likes or comments.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedMedia {
    #[serde(flatten)]
    pub media: MediaObject,
    pub author: UserSummary,
    #[serde(rename = "_count")]
    pub counts: EngagementCounts,
}
