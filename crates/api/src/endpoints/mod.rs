//! API endpoints.

mod admin;
mod auth;
mod results;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/votes", votes::router())
        .nest("/results", results::router())
        .nest("/admin", admin::router())
}
