//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Acknowledgement body for operations with nothing to return.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Empty success response.
#[must_use]
pub const fn ok() -> ApiResponse<OkResponse> {
    ApiResponse::ok(OkResponse { ok: true })
}
