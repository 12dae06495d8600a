//! Shared harness: the full router over in-memory stores
#![allow(dead_code)]

use anyhow::Result;
use api::{AppState, create_router, models::{Comment, LikeToggle}, repositories::InteractionStore};
use async_trait::async_trait;
use auth::{
    AuthState, IdentityResolver, JwtConfig, JwtService, SessionCookies, User,
    jwt::SessionIdentity, testing::InMemoryUserStore,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::Utc;
use media::{
    MediaCatalog, UploadPipeline, UploadPolicy,
    testing::{InMemoryMediaStore, InMemoryObjectStore},
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "----media-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub jwt: JwtService,
    pub users: Arc<InMemoryUserStore>,
    pub objects: Arc<InMemoryObjectStore>,
    pub media: Arc<InMemoryMediaStore>,
    pub interactions: Arc<InMemoryInteractionStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let jwt = JwtService::new(&JwtConfig::new("integration-secret").unwrap());
        let users = Arc::new(InMemoryUserStore::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let media = Arc::new(InMemoryMediaStore::with_users(users.clone()));
        let interactions = Arc::new(InMemoryInteractionStore::default());

        let state = AppState {
            auth: AuthState {
                identity: IdentityResolver::new(jwt.clone(), users.clone()),
                sessions: SessionCookies::new(jwt.clone(), false),
                users: users.clone(),
            },
            uploads: UploadPipeline::new(
                UploadPolicy::default(),
                objects.clone(),
                media.clone(),
                users.clone(),
            ),
            catalog: MediaCatalog::new(media.clone(), objects.clone()),
            interactions: interactions.clone(),
        };

        Self {
            router: create_router(state),
            jwt,
            users,
            objects,
            media,
            interactions,
        }
    }

    /// `Cookie` header value carrying a fresh session for `user`
    pub fn cookie_for(&self, user: &User) -> String {
        let token = self.jwt.issue(&SessionIdentity::from(user)).unwrap();
        format!("auth-token={}", token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// One part of a multipart form; `file` is `(file name, content type)`
pub struct Part<'a> {
    pub name: &'a str,
    pub file: Option<(&'a str, &'a str)>,
    pub data: Vec<u8>,
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, data: Vec<u8>) -> Self {
        Self {
            name,
            file: Some((file_name, content_type)),
            data,
        }
    }

    pub fn text(name: &'a str, value: &str) -> Self {
        Self {
            name,
            file: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file {
            Some((file_name, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        part.name, file_name, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(cookie: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::post("/api/photos").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Likes and comments kept in memory; posts must be registered first
#[derive(Default)]
pub struct InMemoryInteractionStore {
    posts: Mutex<HashSet<Uuid>>,
    likes: Mutex<HashSet<(Uuid, Uuid)>>,
    comments: Mutex<HashMap<Uuid, Comment>>,
}

impl InMemoryInteractionStore {
    pub fn add_post(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.lock().unwrap().insert(id);
        id
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().len()
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        Ok(self.posts.lock().unwrap().contains(&post_id))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<LikeToggle> {
        let mut likes = self.likes.lock().unwrap();
        let liked = if likes.remove(&(post_id, user_id)) {
            false
        } else {
            likes.insert((post_id, user_id));
            true
        };
        let count = likes.iter().filter(|(post, _)| *post == post_id).count() as i64;
        Ok(LikeToggle { liked, count })
    }

    async fn create_comment(&self, post_id: Uuid, author_id: Uuid, content: &str) -> Result<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            content: content.to_string(),
            post_id,
            author_id,
            created_at: Utc::now(),
        };
        self.comments.lock().unwrap().insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(self.comments.lock().unwrap().get(&comment_id).cloned())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<bool> {
        Ok(self.comments.lock().unwrap().remove(&comment_id).is_some())
    }
}
