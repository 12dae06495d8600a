//! Media record repository

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use auth::UserSummary;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::models::{EngagementCounts, MediaKind, MediaObject, MediaPost, NewMediaObject};

/// Access to persisted media records
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Create a published media record
    async fn create(&self, new_media: &NewMediaObject) -> Result<MediaObject>;

    /// Published records with their owners, newest first
    async fn list_published(&self) -> Result<Vec<MediaPost>>;
}

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    content: String,
    title: String,
    slug: String,
    file_type: String,
    file_size: i64,
    mime_type: String,
    published: bool,
    author_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for MediaObject {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        let media_kind = MediaKind::parse(&row.file_type)
            .ok_or_else(|| anyhow!("Unknown file type {:?} on post {}", row.file_type, row.id))?;

        Ok(MediaObject {
            id: row.id,
            storage_key: row.content,
            caption: row.title,
            slug: row.slug,
            media_kind,
            file_size: row.file_size,
            mime_type: row.mime_type,
            published: row.published,
            owner_id: row.author_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PostWithAuthorRow {
    #[sqlx(flatten)]
    post: PostRow,
    author_username: String,
    author_name: Option<String>,
    author_avatar: Option<String>,
    like_count: i64,
    comment_count: i64,
}

const POST_COLUMNS: &str =
    "id, content, title, slug, file_type, file_size, mime_type, published, author_id, created_at";

/// PostgreSQL-backed media store over the `posts` table
#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn create(&self, new_media: &NewMediaObject) -> Result<MediaObject> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (id, content, title, slug, file_type, file_size, mime_type, published, author_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, NOW())
             RETURNING {}",
            POST_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_media.storage_key)
        .bind(&new_media.caption)
        .bind(&new_media.slug)
        .bind(new_media.media_kind.as_str())
        .bind(new_media.file_size)
        .bind(&new_media.mime_type)
        .bind(new_media.owner_id)
        .fetch_one(&self.pool)
        .await?;

        info!(media_id = %row.id, author_id = %row.author_id, "Media record created");
        MediaObject::try_from(row)
    }

    async fn list_published(&self) -> Result<Vec<MediaPost>> {
        let rows = sqlx::query_as::<_, PostWithAuthorRow>(
            "SELECT p.id, p.content, p.title, p.slug, p.file_type, p.file_size, p.mime_type,
                    p.published, p.author_id, p.created_at,
                    u.username AS author_username,
                    u.name AS author_name,
                    u.avatar AS author_avatar,
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
             FROM posts p
             JOIN users u ON u.id = p.author_id
             WHERE p.published = TRUE
             ORDER BY p.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<MediaPost> {
                let author = UserSummary {
                    id: row.post.author_id,
                    username: row.author_username,
                    name: row.author_name,
                    avatar: row.author_avatar,
                };
                Ok(MediaPost {
                    media: MediaObject::try_from(row.post)?,
                    author,
                    counts: EngagementCounts {
                        likes: row.like_count,
                        comments: row.comment_count,
                    },
                })
            })
            .collect()
    }
}
