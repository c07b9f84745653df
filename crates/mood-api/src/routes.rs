//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use rust_embed::RustEmbed;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{analyze, export_csv, get_image, get_session, get_summary, health};
use crate::middleware::{cors_layer, rate_limit_middleware, request_logging, RateLimiterCache};
use crate::state::AppState;

/// Embedded single-page UI.
#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Serve the upload page.
async fn index_page() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(file) => Html(file.data.into_owned()).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "index page missing").into_response(),
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .route("/analyze", post(analyze))
        .route("/sessions/:session_id", get(get_session))
        .route("/sessions/:session_id/images/:index", get(get_image))
        .route("/sessions/:session_id/summary", get(get_summary))
        .route("/sessions/:session_id/export", get(export_csv))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    Router::new()
        .route("/", get(index_page))
        .nest("/api", api_routes)
        .merge(health_routes)
        // Uploads carry whole photo batches; raise both body limits together
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
