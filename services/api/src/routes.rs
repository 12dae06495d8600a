//! API service routes

use auth::{User, UserSummary, middleware::require_user};
use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use media::CandidateFile;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{CommentQuery, CommentResponse, CreateCommentRequest, LikeRequest},
};

/// Multipart framing and the caption field on top of the largest file
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let auth_layer = || middleware::from_fn_with_state(state.auth.identity.clone(), require_user);
    let body_limit = state.uploads.policy().largest_ceiling() + FORM_OVERHEAD_BYTES;

    let photos = get(list_photos).merge(
        post(upload_photo)
            .layer(DefaultBodyLimit::max(body_limit))
            .route_layer(auth_layer()),
    );

    let interactions = Router::new()
        .route("/api/likes", post(toggle_like))
        .route("/api/comments", post(create_comment).delete(delete_comment))
        .route_layer(auth_layer());

    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/auth",
            auth::routes::create_router().with_state(state.auth.clone()),
        )
        .route("/api/photos", photos)
        .merge(interactions)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api"
    }))
}

/// Published media with signed URLs
pub async fn list_photos(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let photos = state.catalog.list_published().await?;
    Ok(Json(json!({ "photos": photos })))
}

/// Multipart upload of a single `photo` file with an optional `caption`
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    // Users at quota are turned away before the body is read
    state
        .uploads
        .policy()
        .check_quota(user.upload_count)
        .inspect_err(|e| warn!(error = %e, user_id = %user.id, "Upload rejected"))?;

    let form = read_upload_form(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let uploaded = state.uploads.upload(&user, file, form.caption).await?;

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "photo": uploaded,
    })))
}

#[derive(Default)]
struct UploadForm {
    file: Option<CandidateFile>,
    caption: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some("photo") => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;

                // A text field named `photo` is not a file
                let Some(file_name) = file_name else {
                    continue;
                };

                form.file = Some(CandidateFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            Some("caption") => {
                form.caption = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload body exceeded the request limit");
        ApiError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        ApiError::BadRequest(format!("Invalid multipart form: {}", e.body_text()))
    }
}

/// Toggle the caller's like on a post
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<LikeRequest>,
) -> ApiResult<impl IntoResponse> {
    let post_id = parse_id(payload.post_id.as_deref(), "Post ID is required")?;
    ensure_post_exists(&state, post_id).await?;

    let toggle = state
        .interactions
        .toggle_like(post_id, user.id)
        .await
        .map_err(|e| {
            error!(error = %e, post_id = %post_id, "Failed to toggle like");
            ApiError::InternalServerError
        })?;

    let message = if toggle.liked { "Post liked" } else { "Post unliked" };
    info!(post_id = %post_id, user_id = %user.id, liked = toggle.liked, "Like toggled");

    Ok(Json(json!({
        "liked": toggle.liked,
        "count": toggle.count,
        "message": message,
    })))
}

/// Comment on a post
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(content), Some(post_id)) = (payload.content, payload.post_id) else {
        return Err(ApiError::BadRequest(
            "Content and post ID are required".to_string(),
        ));
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Comment cannot be empty".to_string()));
    }

    let post_id = parse_id(Some(&post_id), "Content and post ID are required")?;
    ensure_post_exists(&state, post_id).await?;

    let comment = state
        .interactions
        .create_comment(post_id, user.id, content)
        .await
        .map_err(|e| {
            error!(error = %e, post_id = %post_id, "Failed to create comment");
            ApiError::InternalServerError
        })?;

    info!(comment_id = %comment.id, post_id = %post_id, "Comment created");

    let comment = CommentResponse {
        comment,
        author: UserSummary::from(&user),
    };
    Ok(Json(json!({ "comment": comment })))
}

/// Delete one of the caller's comments
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<CommentQuery>,
) -> ApiResult<impl IntoResponse> {
    let comment_id = parse_id(query.comment_id.as_deref(), "Comment ID is required")?;

    let comment = state
        .interactions
        .find_comment(comment_id)
        .await
        .map_err(|e| {
            error!(error = %e, comment_id = %comment_id, "Failed to load comment");
            ApiError::InternalServerError
        })?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only delete your own comments".to_string(),
        ));
    }

    let deleted = state
        .interactions
        .delete_comment(comment_id)
        .await
        .map_err(|e| {
            error!(error = %e, comment_id = %comment_id, "Failed to delete comment");
            ApiError::InternalServerError
        })?;

    if !deleted {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }

    info!(comment_id = %comment_id, "Comment deleted");
    Ok(Json(json!({"message": "Comment deleted successfully"})))
}

/// Parse a required id from a body or query field
fn parse_id(value: Option<&str>, missing_message: &str) -> ApiResult<Uuid> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(missing_message.to_string()))?;

    Uuid::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", value)))
}

async fn ensure_post_exists(state: &AppState, post_id: Uuid) -> ApiResult<()> {
    let exists = state.interactions.post_exists(post_id).await.map_err(|e| {
        error!(error = %e, post_id = %post_id, "Failed to look up post");
        ApiError::InternalServerError
    })?;

    if exists {
        Ok(())
    } else {
        Err(ApiError::NotFound("Post not found".to_string()))
    }
}
