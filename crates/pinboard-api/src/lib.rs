pub mod auth;
pub mod comments;
pub mod middleware;
pub mod posts;
pub mod users;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};

use crate::auth::AppState;
use crate::middleware::require_auth;

/// REST routes: the public surface plus the token-protected mutations.
pub fn routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/users", get(users::list_users))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/comments", get(comments::list_comments))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", put(posts::update_post))
        .route("/posts/{id}", delete(posts::delete_post))
        .route("/posts/{id}/comments", post(comments::create_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    public.merge(protected)
}
