//! Voter endpoints.

use awards_common::AppResult;
use awards_core::{BallotEntry, CastVoteInput, VoteReceipt, VotingStatus};
use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Every active category with the caller's progress.
async fn ballot(
    AuthUser(auth): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<BallotEntry>>> {
    let entries = state.vote_service.ballot(&auth).await?;
    Ok(ApiResponse::ok(entries))
}

/// Cast one vote.
async fn cast(
    AuthUser(auth): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CastVoteInput>,
) -> AppResult<ApiResponse<VoteReceipt>> {
    let receipt = state.vote_service.cast_vote(&auth, req).await?;
    Ok(ApiResponse::ok(receipt))
}

/// Voting status request.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub category_id: String,
}

/// The caller's standing in one category.
async fn status(
    AuthUser(auth): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<StatusRequest>,
) -> AppResult<ApiResponse<VotingStatus>> {
    let status = state
        .vote_service
        .voting_status(&auth, &req.category_id)
        .await?;
    Ok(ApiResponse::ok(status))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ballot", post(ballot))
        .route("/cast", post(cast))
        .route("/status", post(status))
}
