//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FsContentStore, ScriptRunner},
    config::Config,
    error::ApiError,
    web::{rest, state::AppState, ApiDoc},
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Origins always allowed during local development; extras come from
/// `BACKEND_CORS_ORIGINS`.
const DEFAULT_ORIGINS: [&str; 3] = [
    "http://localhost:8080",
    "http://localhost:5173",
    "http://localhost:3000",
];

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Build the Content Store & Script Runner ---
    let store = Arc::new(FsContentStore::new(
        config.content_dir.clone(),
        config.backup_dir.clone(),
    )?);
    let generator = Arc::new(ScriptRunner::new(
        config.generation_script.clone(),
        config.generation_timeout,
    ));
    if !generator.script_exists() {
        warn!(
            "Generation script not found at {}; /generate-content/ will fail until it exists",
            config.generation_script.display()
        );
    }

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        generator,
        config: config.clone(),
    });

    // --- 4. Configure CORS ---
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in DEFAULT_ORIGINS
        .iter()
        .map(|s| s.to_string())
        .chain(config.extra_cors_origins.iter().cloned())
    {
        match origin.parse::<HeaderValue>() {
            Ok(value) => origins.push(value),
            Err(_) => warn!("Ignoring invalid CORS origin: {}", origin),
        }
    }
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/", get(rest::root_handler))
        .route("/upload-curriculum/", post(rest::upload_curriculum_handler))
        .route("/generate-content/", post(rest::generate_content_handler))
        .route("/status/", get(rest::status_handler))
        .route("/generation/status", get(rest::generation_status_handler))
        .route("/generated-files/", get(rest::generated_files_handler))
        .route("/files/{category}", get(rest::list_category_files_handler))
        .route(
            "/download/{category}/{filename}",
            get(rest::download_handler),
        )
        .route("/courses", get(rest::courses_handler))
        .route("/courses/{slug}", get(rest::course_detail_handler))
        .route("/course-material/preview", get(rest::preview_handler))
        .route("/debug/info", get(rest::debug_info_handler))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete
    // application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
