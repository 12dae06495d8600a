//! User repository for database operations

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewUser, User};

/// Access to persisted user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find a user by email address
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Whether any user already holds this email or username
    async fn exists_with_email_or_username(&self, email: &str, username: &str) -> Result<bool>;

    /// Create a new user with an upload count of zero
    async fn create(&self, new_user: &NewUser) -> Result<User>;

    /// Add one to the user's upload count
    ///
    /// Not conditional on the current value: the quota decision is taken by
    /// the caller on the record it already read.
    async fn increment_upload_count(&self, id: Uuid) -> Result<()>;
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, name, avatar, upload_count, created_at";

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn exists_with_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!(username = %new_user.username, "Creating new user");

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, username, password_hash, name, upload_count)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn increment_upload_count(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE users SET upload_count = upload_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("User {} not found while incrementing upload count", id);
        }

        Ok(())
    }
}
