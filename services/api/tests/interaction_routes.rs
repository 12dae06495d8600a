mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TestApp, body_json, json_request};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_like_toggles() {
    let app = TestApp::new();
    let user = app.users.insert_user("ada", 0);
    let cookie = app.cookie_for(&user);
    let post_id = app.interactions.add_post();

    let like = app
        .send(json_request(
            "POST",
            "/api/likes",
            Some(&cookie),
            json!({"postId": post_id}),
        ))
        .await;
    assert_eq!(like.status(), StatusCode::OK);
    let body = body_json(like).await;
    assert_eq!(body["liked"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["message"], "Post liked");

    let unlike = app
        .send(json_request(
            "POST",
            "/api/likes",
            Some(&cookie),
            json!({"postId": post_id}),
        ))
        .await;
    let body = body_json(unlike).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_like_requires_known_post_and_session() {
    let app = TestApp::new();
    let user = app.users.insert_user("ada", 0);
    let cookie = app.cookie_for(&user);

    let anonymous = app
        .send(json_request(
            "POST",
            "/api/likes",
            None,
            json!({"postId": app.interactions.add_post()}),
        ))
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let missing = app
        .send(json_request(
            "POST",
            "/api/likes",
            Some(&cookie),
            json!({"postId": Uuid::new_v4()}),
        ))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(missing).await["error"], "Post not found");

    let no_id = app
        .send(json_request("POST", "/api/likes", Some(&cookie), json!({})))
        .await;
    assert_eq!(no_id.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(no_id).await["error"], "Post ID is required");
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let app = TestApp::new();
    let author = app.users.insert_user("ada", 0);
    let other = app.users.insert_user("bob", 0);
    let author_cookie = app.cookie_for(&author);
    let other_cookie = app.cookie_for(&other);
    let post_id = app.interactions.add_post();

    let created = app
        .send(json_request(
            "POST",
            "/api/comments",
            Some(&author_cookie),
            json!({"postId": post_id, "content": "  lovely light  "}),
        ))
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let body = body_json(created).await;
    assert_eq!(body["comment"]["content"], "lovely light");
    assert_eq!(body["comment"]["author"]["username"], "ada");
    let comment_id = body["comment"]["id"].as_str().unwrap().to_string();

    let delete = |cookie: &str| {
        Request::delete(format!("/api/comments?commentId={}", comment_id))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let forbidden = app.send(delete(&other_cookie)).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(forbidden).await["error"],
        "You can only delete your own comments"
    );
    assert_eq!(app.interactions.comment_count(), 1);

    let deleted = app.send(delete(&author_cookie)).await;
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(app.interactions.comment_count(), 0);

    let gone = app.send(delete(&author_cookie)).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comment_validation() {
    let app = TestApp::new();
    let user = app.users.insert_user("ada", 0);
    let cookie = app.cookie_for(&user);
    let post_id = app.interactions.add_post();

    let blank = app
        .send(json_request(
            "POST",
            "/api/comments",
            Some(&cookie),
            json!({"postId": post_id, "content": "   "}),
        ))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(blank).await["error"], "Comment cannot be empty");

    let missing = app
        .send(json_request(
            "POST",
            "/api/comments",
            Some(&cookie),
            json!({"content": "hello"}),
        ))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown_post = app
        .send(json_request(
            "POST",
            "/api/comments",
            Some(&cookie),
            json!({"postId": Uuid::new_v4(), "content": "hello"}),
        ))
        .await;
    assert_eq!(unknown_post.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.interactions.comment_count(), 0);
}
