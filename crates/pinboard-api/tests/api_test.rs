//! Drives the REST surface through the assembled router: registration and
//! login, token-protected post mutations, and the ownership rules.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use pinboard_api::auth::{AppState, AppStateInner};
use pinboard_db::Database;

const SECRET: &str = "test-secret";

fn test_app() -> Router {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: SECRET.to_string(),
    });
    pinboard_api::routes(state)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register_and_login(app: &Router, username: &str) -> String {
    let creds = json!({ "username": username, "password": "hunter2long" });
    let (status, _) = send_json(app, "POST", "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(app, "POST", "/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    body["accessToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_round_trip() {
    let app = test_app();
    let token = register_and_login(&app, "alice").await;
    assert!(!token.is_empty());

    // The token authenticates a protected request
    let (status, body) = send_json(
        &app,
        "POST",
        "/posts",
        Some(&token),
        Some(json!({ "title": "hello", "content": "world", "category": "general" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "hello");
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = test_app();
    let creds = json!({ "username": "alice", "password": "hunter2long" });

    let (status, _) = send_json(&app, "POST", "/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send_json(&app, "POST", "/register", None, Some(creds)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = test_app();
    let (status, _) = send_json(
        &app,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = test_app();
    register_and_login(&app, "alice").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "not-it" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = test_app();
    let post = json!({ "title": "t", "content": "c" });

    let (status, _) = send_json(&app, "POST", "/posts", None, Some(post.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send_json(&app, "POST", "/posts", Some("not-a-token"), Some(post)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_reads_need_no_token() {
    let app = test_app();
    let token = register_and_login(&app, "alice").await;
    send_json(
        &app,
        "POST",
        "/posts",
        Some(&token),
        Some(json!({ "title": "t", "content": "c" })),
    )
    .await;

    let (status, body) = send_json(&app, "GET", "/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send_json(&app, "GET", "/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["username"], "alice");
}

#[tokio::test]
async fn posts_can_only_be_changed_by_their_author() {
    let app = test_app();
    let alice = register_and_login(&app, "alice").await;
    let bob = register_and_login(&app, "bob").await;

    let (_, created) = send_json(
        &app,
        "POST",
        "/posts",
        Some(&alice),
        Some(json!({ "title": "mine", "content": "c" })),
    )
    .await;
    let post_id = created["id"].as_i64().unwrap();

    let update = json!({ "title": "stolen", "content": "c" });
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/posts/{post_id}"),
        Some(&bob),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/posts/{post_id}"),
        Some(&alice),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = send_json(&app, "GET", &format!("/posts/{post_id}"), None, None).await;
    assert_eq!(fetched["title"], "stolen");

    let (status, _) =
        send_json(&app, "DELETE", &format!("/posts/{post_id}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        send_json(&app, "DELETE", &format!("/posts/{post_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(&app, "GET", &format!("/posts/{post_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_attach_to_existing_posts_only() {
    let app = test_app();
    let alice = register_and_login(&app, "alice").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/posts/999/comments",
        Some(&alice),
        Some(json!({ "content": "into the void" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, created) = send_json(
        &app,
        "POST",
        "/posts",
        Some(&alice),
        Some(json!({ "title": "t", "content": "c" })),
    )
    .await;
    let post_id = created["id"].as_i64().unwrap();

    let (status, comment) = send_json(
        &app,
        "POST",
        &format!("/posts/{post_id}/comments"),
        Some(&alice),
        Some(json!({ "content": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["content"], "first");

    let (status, listed) = send_json(
        &app,
        "GET",
        &format!("/posts/{post_id}/comments"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["username"], "alice");
}
