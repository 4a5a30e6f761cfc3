//! Results endpoints.

use awards_common::AppResult;
use awards_core::{CategoryResults, ResultsView};
use awards_db::entities::category::Phase;
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Show results request.
#[derive(Debug, Deserialize)]
pub struct ShowResultsRequest {
    pub category_id: String,
    /// Defaults to the phase shown for the category's state.
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub view: ResultsView,
}

/// Results of one category.
async fn show(
    AuthUser(auth): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ShowResultsRequest>,
) -> AppResult<ApiResponse<CategoryResults>> {
    let results = state
        .results_service
        .get_results(&auth, &req.category_id, req.phase, req.view)
        .await?;
    Ok(ApiResponse::ok(results))
}

/// Official results of every finalized category.
async fn finalized(
    AuthUser(_auth): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<CategoryResults>>> {
    let results = state.results_service.finalized_results().await?;
    Ok(ApiResponse::ok(results))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/show", post(show))
        .route("/finalized", post(finalized))
}
