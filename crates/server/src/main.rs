//! Awards server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use awards_api::{AppState, auth_middleware, router as api_router};
use awards_common::Config;
use awards_core::{
    AccessCodeService, AuthService, CatalogService, ImageService, LocalStorage, PhaseService,
    ResultsService, StorageService, VoteService,
};
use awards_db::repositories::{
    AccessCodeRepository, CategoryRepository, FinalistRepository, NomineeRepository,
    UserRepository, VoteRepository,
};
use axum::{Router, extract::DefaultBodyLimit, middleware};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    map_response_body::MapResponseBodyLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headroom for multipart framing on top of the image size limit.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            "awards_server=debug,awards_api=debug,awards_core=debug,awards_db=info,tower_http=debug"
                .into()
        });

    // AWARDS_LOG_FORMAT=json for log shippers
    if std::env::var("AWARDS_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();
    }
}

/// Wire repositories into services.
fn build_state(db: &Arc<DatabaseConnection>, config: &Config) -> AppState {
    let user_repo = UserRepository::new(Arc::clone(db));
    let code_repo = AccessCodeRepository::new(Arc::clone(db));
    let category_repo = CategoryRepository::new(Arc::clone(db));
    let nominee_repo = NomineeRepository::new(Arc::clone(db));
    let finalist_repo = FinalistRepository::new(Arc::clone(db));
    let vote_repo = VoteRepository::new(Arc::clone(db));

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
    let phase_service = PhaseService::new(
        category_repo.clone(),
        results_service.clone(),
        config.voting.finalist_suggestions,
    );
    let vote_service = VoteService::new(
        category_repo.clone(),
        nominee_repo.clone(),
        finalist_repo,
        vote_repo,
        config.voting.nomination_cap,
    );

    AppState {
        auth_service: AuthService::new(user_repo, code_repo.clone(), config),
        vote_service,
        phase_service,
        results_service,
        catalog_service: CatalogService::new(category_repo, nominee_repo, image_service.clone()),
        access_code_service: AccessCodeService::new(code_repo),
        image_service,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting awards server...");

    // Load configuration
    let config = Config::load()?;
    if config.reserved_admin().is_none() {
        warn!("No reserved administrator configured");
    }

    // Connect to database
    let db = Arc::new(awards_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    awards_db::migrate(&db).await?;
    info!("Migrations completed");

    let state = build_state(&db, &config);

    let mut app = Router::new().nest("/api", api_router());

    // Serve uploaded images when they are published under a local path
    let files_path = config.storage.base_url.trim_end_matches('/');
    if files_path.starts_with('/') && files_path.len() > 1 {
        info!(path = %files_path, dir = %config.storage.base_path.display(), "Serving uploaded images");
        app = app.nest_service(files_path, ServeDir::new(&config.storage.base_path));
    }

    let app = app
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new())
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    config.storage.max_image_bytes + BODY_LIMIT_SLACK,
                )),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
