use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use pinboard_types::models::User;

use crate::auth::AppState;

/// The user list backing the chat sidebar. Deliberately unauthenticated:
/// clients fetch it before logging in to show who is available to chat.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.list_users())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let users: Vec<User> = rows
        .into_iter()
        .map(|(id, username)| User { id, username })
        .collect();

    Ok(Json(users))
}
