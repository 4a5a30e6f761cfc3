//! Authentication endpoints.

use awards_common::AppResult;
use awards_core::{AuthContext, Session, SigninInput, SignupInput};
use axum::{Json, Router, extract::State, routing::post};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create a new account by redeeming an access code.
async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupInput>,
) -> AppResult<ApiResponse<Session>> {
    let session = state.auth_service.signup(req).await?;
    Ok(ApiResponse::ok(session))
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninInput>,
) -> AppResult<ApiResponse<Session>> {
    let session = state.auth_service.signin(req).await?;
    Ok(ApiResponse::ok(session))
}

/// Identity behind the presented token.
async fn me(AuthUser(auth): AuthUser) -> AppResult<ApiResponse<AuthContext>> {
    Ok(ApiResponse::ok(auth))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/me", post(me))
}
