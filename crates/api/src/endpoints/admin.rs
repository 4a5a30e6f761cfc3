//! Administration endpoints.
//!
//! Every handler takes [`AdminUser`], so voters get `Forbidden` and
//! anonymous callers `Unauthorized`.

use awards_common::{AppError, AppResult};
use awards_core::{
    AccessCodeList, CreateCategoryInput, CreateNomineeInput, FinalistProposal, ImageFolder,
    Overview, StoredImage, UpdateCategoryInput, UpdateNomineeInput,
};
use awards_db::entities::{access_code, category, nominee};
use axum::{
    Json, Router,
    extract::{Multipart, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::AdminUser,
    middleware::AppState,
    response::{ApiResponse, OkResponse, ok},
};

/// Request addressing a record by ID.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

/// Request addressing a category.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_id: String,
}

// === Categories ===

async fn list_categories(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<category::Model>>> {
    let categories = state.catalog_service.list_categories().await?;
    Ok(ApiResponse::ok(categories))
}

async fn create_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryInput>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.catalog_service.create_category(req).await?;
    Ok(ApiResponse::ok(category))
}

async fn update_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateCategoryInput>,
) -> AppResult<ApiResponse<category::Model>> {
    let category = state.catalog_service.update_category(req).await?;
    Ok(ApiResponse::ok(category))
}

async fn delete_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<IdRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.catalog_service.delete_category(&req.id).await?;
    Ok(ok())
}

// === Nominees ===

async fn list_nominees(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<nominee::Model>>> {
    let nominees = state.catalog_service.list_nominees().await?;
    Ok(ApiResponse::ok(nominees))
}

async fn create_nominee(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CreateNomineeInput>,
) -> AppResult<ApiResponse<nominee::Model>> {
    let nominee = state.catalog_service.create_nominee(req).await?;
    Ok(ApiResponse::ok(nominee))
}

async fn update_nominee(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateNomineeInput>,
) -> AppResult<ApiResponse<nominee::Model>> {
    let nominee = state.catalog_service.update_nominee(req).await?;
    Ok(ApiResponse::ok(nominee))
}

async fn delete_nominee(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<IdRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.catalog_service.delete_nominee(&req.id).await?;
    Ok(ok())
}

// === Phases ===

async fn start_phase_1(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<ApiResponse<category::Model>> {
    tracing::debug!(admin = %admin.user_id, category_id = %req.category_id, "start-phase-1");
    let category = state.phase_service.start_phase_1(&req.category_id).await?;
    Ok(ApiResponse::ok(category))
}

async fn finish_phase_1(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<ApiResponse<FinalistProposal>> {
    tracing::debug!(admin = %admin.user_id, category_id = %req.category_id, "finish-phase-1");
    let proposal = state.phase_service.finish_phase_1(&req.category_id).await?;
    Ok(ApiResponse::ok(proposal))
}

async fn phase_1_results(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<ApiResponse<FinalistProposal>> {
    let proposal = state.phase_service.phase_1_results(&req.category_id).await?;
    Ok(ApiResponse::ok(proposal))
}

/// Finalist selection request. An empty list clears the set.
#[derive(Debug, Deserialize, Validate)]
pub struct SelectFinalistsRequest {
    pub category_id: String,
    #[validate(length(max = 100))]
    pub nominee_ids: Vec<String>,
}

/// Finalist selection response.
#[derive(Debug, Serialize)]
pub struct SelectFinalistsResponse {
    pub category_id: String,
    pub finalists: Vec<String>,
}

async fn select_finalists(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<SelectFinalistsRequest>,
) -> AppResult<ApiResponse<SelectFinalistsResponse>> {
    req.validate()?;
    tracing::debug!(admin = %admin.user_id, category_id = %req.category_id, "select-finalists");

    let finalists = state
        .phase_service
        .select_finalists(&req.category_id, req.nominee_ids)
        .await?;

    Ok(ApiResponse::ok(SelectFinalistsResponse {
        category_id: req.category_id,
        finalists,
    }))
}

async fn start_phase_2(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<ApiResponse<category::Model>> {
    tracing::debug!(admin = %admin.user_id, category_id = %req.category_id, "start-phase-2");
    let category = state.phase_service.start_phase_2(&req.category_id).await?;
    Ok(ApiResponse::ok(category))
}

async fn finish_phase_2(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<ApiResponse<category::Model>> {
    tracing::debug!(admin = %admin.user_id, category_id = %req.category_id, "finish-phase-2");
    let category = state.phase_service.finish_phase_2(&req.category_id).await?;
    Ok(ApiResponse::ok(category))
}

// === Access codes ===

async fn list_codes(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AccessCodeList>> {
    let codes = state.access_code_service.list().await?;
    Ok(ApiResponse::ok(codes))
}

/// Access code creation request. Omit `code` to generate one.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateCodeRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
}

async fn create_code(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCodeRequest>,
) -> AppResult<ApiResponse<access_code::Model>> {
    req.validate()?;
    let code = state.access_code_service.create(req.code).await?;
    Ok(ApiResponse::ok(code))
}

async fn delete_code(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<IdRequest>,
) -> AppResult<ApiResponse<OkResponse>> {
    state.access_code_service.delete(&req.id).await?;
    Ok(ok())
}

// === Dashboard ===

async fn overview(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Overview>> {
    let overview = state.results_service.overview().await?;
    Ok(ApiResponse::ok(overview))
}

/// Upload a category banner or nominee image via multipart form.
///
/// Fields: `folder` (`categories` or `nominees`) and `file`.
async fn upload_image(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<StoredImage>> {
    let mut folder: Option<ImageFolder> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "folder" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                folder = Some(text.trim().parse()?);
            }
            "file" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                file = Some((content_type, data));
            }
            _ => {}
        }
    }

    let folder = folder.ok_or_else(|| AppError::BadRequest("No folder provided".to_string()))?;
    let (content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let stored = state
        .image_service
        .upload(folder, &content_type, &data)
        .await?;
    Ok(ApiResponse::ok(stored))
}

fn categories_router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list_categories))
        .route("/create", post(create_category))
        .route("/update", post(update_category))
        .route("/delete", post(delete_category))
}

fn nominees_router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list_nominees))
        .route("/create", post(create_nominee))
        .route("/update", post(update_nominee))
        .route("/delete", post(delete_nominee))
}

fn phases_router() -> Router<AppState> {
    Router::new()
        .route("/start-phase-1", post(start_phase_1))
        .route("/finish-phase-1", post(finish_phase_1))
        .route("/phase-1-results", post(phase_1_results))
        .route("/select-finalists", post(select_finalists))
        .route("/start-phase-2", post(start_phase_2))
        .route("/finish-phase-2", post(finish_phase_2))
}

fn codes_router() -> Router<AppState> {
    Router::new()
        .route("/list", post(list_codes))
        .route("/create", post(create_code))
        .route("/delete", post(delete_code))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/categories", categories_router())
        .nest("/nominees", nominees_router())
        .nest("/phases", phases_router())
        .nest("/codes", codes_router())
        .route("/overview", post(overview))
        .route("/upload", post(upload_image))
}
