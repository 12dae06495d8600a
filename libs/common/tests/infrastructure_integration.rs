//! Integration test for the PostgreSQL collaborator
//!
//! Verifies that the database named by `DATABASE_URL` is reachable and
//! exposes the tables the services read and write. Run with
//! `cargo test -- --ignored` against a provisioned database.

use common::database::{DatabaseConfig, health_check, init_pool};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running PostgreSQL with the application schema"]
async fn test_database_schema_is_reachable() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    for table in ["users", "posts", "likes", "comments"] {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1) AS present",
        )
        .bind(table)
        .fetch_one(&pool)
        .await?;

        let present: bool = row.get("present");
        assert!(present, "table {} is missing", table);
    }

    Ok(())
}
