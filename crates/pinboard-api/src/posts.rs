use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use pinboard_db::models::PostRow;
use pinboard_types::api::{Claims, CreatePostRequest, UpdatePostRequest};
use pinboard_types::models::Post;

use crate::auth::AppState;

fn post_from_row(row: PostRow) -> Post {
    Post {
        id: row.id,
        user_id: row.user_id,
        username: row.username,
        title: row.title,
        content: row.content,
        category: row.category,
        created_at: pinboard_db::parse_timestamp(&row.created_at),
    }
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.is_empty() || req.content.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let stamp = pinboard_db::format_timestamp(chrono::Utc::now());
    // Round-trip so the response carries what a later read will return
    let created_at = pinboard_db::parse_timestamp(&stamp);

    // Run blocking DB insert off the async runtime
    let db = state.db.clone();
    let user_id = claims.sub;
    let (id, req) = tokio::task::spawn_blocking(move || {
        db.insert_post(user_id, &req.title, &req.content, req.category.as_deref(), &stamp)
            .map(|id| (id, req))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(Post {
            id,
            user_id,
            username: claims.username,
            title: req.title,
            content: req.content,
            category: req.category,
            created_at,
        }),
    ))
}

pub async fn list_posts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_posts())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let posts: Vec<Post> = rows.into_iter().map(post_from_row).collect();
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.get_post(id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(post_from_row(row)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.title.is_empty() || req.content.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let user_id = claims.sub;
    let changed = tokio::task::spawn_blocking(move || {
        db.update_post(id, user_id, &req.title, &req.content, req.category.as_deref())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Zero rows changed: the post is missing or belongs to someone else
    if changed == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let changed = tokio::task::spawn_blocking(move || db.delete_post(id, user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if changed == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
