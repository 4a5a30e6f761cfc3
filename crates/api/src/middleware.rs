//! API middleware.

#![allow(missing_docs)]

use awards_core::{
    AccessCodeService, AuthService, CatalogService, ImageService, PhaseService, ResultsService,
    VoteService,
};
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub vote_service: VoteService,
    pub phase_service: PhaseService,
    pub results_service: ResultsService,
    pub catalog_service: CatalogService,
    pub access_code_service: AccessCodeService,
    pub image_service: ImageService,
}

/// Authentication middleware.
///
/// Resolves the bearer token into an [`awards_core::AuthContext`] request
/// extension. Requests without a valid token pass through anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.authenticate(token.trim()).await {
            Ok(auth) => {
                req.extensions_mut().insert(auth);
            }
            Err(e) if e.is_server_error() => {
                tracing::warn!(error = %e, "Token lookup failed");
            }
            Err(_) => {}
        }
    }

    next.run(req).await
}
