use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use pinboard_types::api::{Claims, CreateCommentRequest};
use pinboard_types::models::Comment;

use crate::auth::AppState;

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let stamp = pinboard_db::format_timestamp(chrono::Utc::now());
    let created_at = pinboard_db::parse_timestamp(&stamp);

    let db = state.db.clone();
    let user_id = claims.sub;
    let (id, req) = tokio::task::spawn_blocking(move || {
        if !db.post_exists(post_id)? {
            return Ok(None);
        }
        db.insert_comment(post_id, user_id, &req.content, &stamp)
            .map(|id| Some((id, req)))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok((
        StatusCode::CREATED,
        Json(Comment {
            id,
            post_id,
            user_id,
            username: claims.username,
            content: req.content,
            created_at,
        }),
    ))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || {
        if !db.post_exists(post_id)? {
            return Ok(None);
        }
        db.list_comments(post_id).map(Some)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
    .ok_or(StatusCode::NOT_FOUND)?;

    let comments: Vec<Comment> = rows
        .into_iter()
        .map(|row| Comment {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            username: row.username,
            content: row.content,
            created_at: pinboard_db::parse_timestamp(&row.created_at),
        })
        .collect();

    Ok(Json(comments))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let changed = tokio::task::spawn_blocking(move || db.delete_comment(id, user_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    // Zero rows changed: the comment is missing or belongs to someone else
    if changed == 0 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
