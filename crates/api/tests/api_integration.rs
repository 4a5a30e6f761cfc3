//! API integration tests.
//!
//! The router runs against a migrated in-memory `SQLite` database, so every
//! request goes through the real services and repositories.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use awards_api::{AppState, auth_middleware, router as api_router};
use awards_common::config::{
    AdminConfig, Config, DatabaseConfig, ServerConfig, StorageConfig, VotingConfig,
};
use awards_core::{
    AccessCodeService, AuthService, CatalogService, ImageService, LocalStorage, PhaseService,
    ResultsService, StorageService, VoteService,
};
use awards_db::repositories::{
    AccessCodeRepository, CategoryRepository, FinalistRepository, NomineeRepository,
    UserRepository, VoteRepository,
};
use awards_db::test_utils::TestDatabase;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-password";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Create a test configuration.
fn create_test_config(files: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "http://localhost:3000".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        voting: VotingConfig::default(),
        admin: AdminConfig {
            email: Some(ADMIN_EMAIL.to_string()),
            password: Some(ADMIN_PASSWORD.to_string()),
        },
        storage: StorageConfig {
            base_path: files.path().to_path_buf(),
            ..StorageConfig::default()
        },
    }
}

struct TestApp {
    router: Router,
    _files: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let files = TempDir::new().unwrap();
        let config = create_test_config(&files);
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().into_connection());

        let user_repo = UserRepository::new(Arc::clone(&db));
        let code_repo = AccessCodeRepository::new(Arc::clone(&db));
        let category_repo = CategoryRepository::new(Arc::clone(&db));
        let nominee_repo = NomineeRepository::new(Arc::clone(&db));
        let finalist_repo = FinalistRepository::new(Arc::clone(&db));
        let vote_repo = VoteRepository::new(Arc::clone(&db));

        let storage: StorageService = Arc::new(LocalStorage::new(
            config.storage.base_path.clone(),
            config.storage.base_url.clone(),
        ));
        let image_service = ImageService::new(storage, &config.storage);

        let results_service = ResultsService::new(
            category_repo.clone(),
            nominee_repo.clone(),
            finalist_repo.clone(),
            vote_repo.clone(),
            user_repo.clone(),
        );

        let state = AppState {
            auth_service: AuthService::new(user_repo, code_repo.clone(), &config),
            vote_service: VoteService::new(
                category_repo.clone(),
                nominee_repo.clone(),
                finalist_repo,
                vote_repo,
                config.voting.nomination_cap,
            ),
            phase_service: PhaseService::new(
                category_repo.clone(),
                results_service.clone(),
                config.voting.finalist_suggestions,
            ),
            results_service,
            catalog_service: CatalogService::new(category_repo, nominee_repo, image_service.clone()),
            access_code_service: AccessCodeService::new(code_repo),
            image_service,
        };

        let router = api_router()
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        Self {
            router,
            _files: files,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/auth/signin",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Issue a code with the admin token and redeem it.
    async fn voter_token(&self, admin: &str, email: &str) -> String {
        let (_, code) = self.post("/admin/codes/create", Some(admin), json!({})).await;
        let code = code["data"]["code"].as_str().unwrap();

        let (status, body) = self
            .post(
                "/auth/signup",
                None,
                json!({ "email": email, "password": "secret-pw", "access_code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create(&self, admin: &str, uri: &str, name: &str) -> String {
        let (status, body) = self.post(uri, Some(admin), json!({ "name": name })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn transition(&self, admin: &str, action: &str, category_id: &str) -> (StatusCode, Value) {
        self.post(
            &format!("/admin/phases/{action}"),
            Some(admin),
            json!({ "category_id": category_id }),
        )
        .await
    }
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = TestApp::new().await;

    let (status, _) = app.post("/nonexistent/endpoint", None, json!({})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_without_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app.post("/auth/me", None, json!({})).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");
}

#[tokio::test]
async fn test_signin_with_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/auth/signin",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrong" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_with_invalid_json_returns_error() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .uri("/auth/signup")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from("{invalid json"))
                .unwrap(),
        )
        .await;

    assert!(response.0.is_client_error());
}

#[tokio::test]
async fn test_reserved_admin_session() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app.post("/auth/me", Some(&admin), json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_admin"], true);
    assert_eq!(body["data"]["is_reserved_admin"], true);
}

#[tokio::test]
async fn test_access_code_is_single_use() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (_, code) = app
        .post("/admin/codes/create", Some(&admin), json!({ "code": "welcome-1" }))
        .await;
    assert_eq!(code["data"]["code"], "WELCOME-1");

    let signup = |email: &'static str| {
        json!({ "email": email, "password": "secret-pw", "access_code": "welcome-1" })
    };
    let (first, _) = app.post("/auth/signup", None, signup("a@example.com")).await;
    let (second, body) = app.post("/auth/signup", None, signup("b@example.com")).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let (_, list) = app.post("/admin/codes/list", Some(&admin), json!({})).await;
    assert_eq!(list["data"]["used"], 1);
    assert_eq!(list["data"]["available"], 0);
}

#[tokio::test]
async fn test_voter_cannot_use_admin_routes() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let voter = app.voter_token(&admin, "voter@example.com").await;

    for uri in [
        "/admin/overview",
        "/admin/categories/list",
        "/admin/codes/list",
    ] {
        let (status, body) = app.post(uri, Some(&voter), json!({})).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(error_code(&body), "FORBIDDEN");
    }

    let (status, _) = app.post("/admin/overview", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reserved_admin_cannot_vote() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let category = app.create(&admin, "/admin/categories/create", "Best Moment").await;
    let nominee = app.create(&admin, "/admin/nominees/create", "Xavier").await;
    app.transition(&admin, "start-phase-1", &category).await;

    let (status, _) = app
        .post(
            "/votes/cast",
            Some(&admin),
            json!({ "category_id": category, "nominee_id": nominee, "phase": 1 }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_two_phase_award_over_http() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let voter = app.voter_token(&admin, "voter@example.com").await;

    let category = app.create(&admin, "/admin/categories/create", "Best Moment").await;
    let x = app.create(&admin, "/admin/nominees/create", "Xavier").await;
    let y = app.create(&admin, "/admin/nominees/create", "Yolanda").await;

    let cast = |nominee: &str, phase: i32| {
        json!({ "category_id": category, "nominee_id": nominee, "phase": phase })
    };

    // Nothing is open yet
    let (status, body) = app.post("/votes/cast", Some(&voter), cast(&x, 1)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "NOT_ELIGIBLE");

    let (status, body) = app.transition(&admin, "start-phase-1", &category).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase_state"], "phase1_active");

    let (status, body) = app.post("/votes/cast", Some(&voter), cast(&x, 1)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["votes_cast"], 1);
    assert_eq!(body["data"]["max_votes"], 2);

    let (status, body) = app.post("/votes/cast", Some(&voter), cast(&x, 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "ALREADY_VOTED");

    let (_, body) = app
        .post("/votes/status", Some(&voter), json!({ "category_id": category }))
        .await;
    assert_eq!(body["data"]["remaining"], 1);
    assert_eq!(body["data"]["nominee_ids"], json!([x]));

    // Voters cannot read unpublished results
    let (status, _) = app
        .post("/results/show", Some(&voter), json!({ "category_id": category }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.transition(&admin, "finish-phase-1", &category).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"]["phase_state"], "phase1_closed");
    assert_eq!(body["data"]["suggested_finalists"][0], x);

    let (status, _) = app.transition(&admin, "finish-phase-1", &category).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.transition(&admin, "phase-1-results", &category).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["results"]["entries"][0]["votes"], 1);
    assert_eq!(body["data"]["results"]["entries"][1]["nominee_id"], y);

    let (status, body) = app
        .post(
            "/admin/phases/select-finalists",
            Some(&admin),
            json!({ "category_id": category, "nominee_ids": [x, x] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["finalists"], json!([x]));

    let (status, _) = app.transition(&admin, "start-phase-2", &category).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/votes/cast", Some(&voter), cast(&y, 2)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "NOT_ELIGIBLE");

    let (status, body) = app.post("/votes/cast", Some(&voter), cast(&x, 2)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["max_votes"], 1);

    let (status, _) = app.transition(&admin, "finish-phase-2", &category).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/results/finalized", Some(&voter), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["entries"][0]["nominee_id"], x);
    assert_eq!(results[0]["entries"][0]["votes"], 1);
    assert_eq!(results[0]["total_votes"], 1);

    let (status, body) = app
        .post("/results/show", Some(&voter), json!({ "category_id": category }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], 2);

    let (_, overview) = app.post("/admin/overview", Some(&admin), json!({})).await;
    assert_eq!(overview["data"]["phase_1_votes"], 1);
    assert_eq!(overview["data"]["phase_2_votes"], 1);
}

#[tokio::test]
async fn test_delete_nominee_with_votes_conflicts() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let voter = app.voter_token(&admin, "voter@example.com").await;
    let category = app.create(&admin, "/admin/categories/create", "Best Moment").await;
    let nominee = app.create(&admin, "/admin/nominees/create", "Xavier").await;
    app.transition(&admin, "start-phase-1", &category).await;
    app.post(
        "/votes/cast",
        Some(&voter),
        json!({ "category_id": category, "nominee_id": nominee, "phase": 1 }),
    )
    .await;

    let (status, _) = app
        .post("/admin/nominees/delete", Some(&admin), json!({ "id": nominee }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_upload_image() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let boundary = "X-AWARDS-BOUNDARY";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\nnominees\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"x.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(PNG);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let (status, json) = app
        .send(
            Request::builder()
                .uri("/admin/upload")
                .method("POST")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .header("Authorization", format!("Bearer {admin}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    let url = json["data"]["url"].as_str().unwrap();
    assert!(url.starts_with("/files/nominees/"));
    assert!(url.ends_with(".png"));
}
