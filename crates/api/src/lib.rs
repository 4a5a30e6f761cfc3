//! HTTP API layer for the awards service.
//!
//! - **Endpoints**: auth, ballot and vote casting, results, administration
//! - **Extractors**: caller identity resolved by the auth middleware
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8. Every endpoint is a `POST` with a JSON body and answers
//! with `{"data": ...}`; failures use the [`awards_common::AppError`] body.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
