use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{AppState, Settings, repositories::PgInteractionStore};
use auth::{AuthState, IdentityResolver, JwtConfig, JwtService, PgUserStore, SessionCookies};
use common::database::{DatabaseConfig, health_check, init_pool};
use media::{
    CloudFrontSigner, MediaCatalog, PgMediaStore, S3ObjectStore, UploadPipeline, UploadPolicy,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let settings = Settings::from_env()?;
    info!(?settings, "Settings loaded");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Object storage behind the CDN
    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.s3_region.clone()))
        .load()
        .await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let signer = CloudFrontSigner::from_pem(
        &settings.cloudfront_domain,
        &settings.cloudfront_key_pair_id,
        &settings.cloudfront_private_key,
    )
    .context("Failed to load CDN signing key")?;
    let objects = Arc::new(S3ObjectStore::new(
        s3_client,
        settings.s3_bucket_name.clone(),
        signer,
    ));

    // Sessions
    let jwt_service = JwtService::new(&JwtConfig::new(&settings.jwt_secret)?);
    let users = Arc::new(PgUserStore::new(pool.clone()));
    let auth = AuthState {
        identity: IdentityResolver::new(jwt_service.clone(), users.clone()),
        sessions: SessionCookies::new(jwt_service, settings.is_production()),
        users: users.clone(),
    };

    let media_store = Arc::new(PgMediaStore::new(pool.clone()));
    let app_state = AppState {
        auth,
        uploads: UploadPipeline::new(
            UploadPolicy::default(),
            objects.clone(),
            media_store.clone(),
            users,
        ),
        catalog: MediaCatalog::new(media_store, objects),
        interactions: Arc::new(PgInteractionStore::new(pool)),
    };

    info!("API service initialized successfully");

    // Start the web server
    let app = api::create_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    info!("API service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
