//! Repositories for likes and comments

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Comment, LikeToggle};

/// Access to likes and comments on published media
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn post_exists(&self, post_id: Uuid) -> Result<bool>;

    /// Add the user's like, or remove it when present; returns the new state
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeToggle>;

    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, content: &str) -> Result<Comment>;

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;

    /// Returns whether a row was removed
    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool>;
}

/// PostgreSQL-backed interaction store
#[derive(Clone)]
pub struct PgInteractionStore {
    pool: PgPool,
}

impl PgInteractionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for PgInteractionStore {
    async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeToggle> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            sqlx::query(
                "INSERT INTO likes (id, post_id, user_id, created_at)
                 VALUES ($1, $2, $3, NOW())
                 ON CONFLICT (post_id, user_id) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(LikeToggle {
            liked: removed == 0,
            count,
        })
    }

    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, content: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, content, post_id, author_id, created_at)
             VALUES ($1, $2, $3, $4, NOW())
             RETURNING id, content, post_id, author_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(content)
        .bind(post_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, content, post_id, author_id, created_at FROM comments WHERE id = $1",
        )
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
