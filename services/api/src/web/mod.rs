pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use playlist_core::validation::MAX_UPLOAD_BYTES;
use rest::{
    generate_video_handler, get_document_handler, get_video_handler, subscribe_handler,
    subscription_handler, upload_handler, ApiDoc,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom above the file limit for multipart framing, so oversized files
/// still reach `upload_handler` and get a 413 from it.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 1024 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
}

/// Builds the complete application: API routes plus the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = cors_layer(&app_state.config.cors_origins);
    let api_router = Router::new()
        .route("/upload", post(upload_handler))
        .route("/documents/{document_id}", get(get_document_handler))
        .route("/generate-video", post(generate_video_handler))
        .route("/videos/{video_id}", get(get_video_handler))
        .route("/subscription", get(subscription_handler))
        .route("/subscribe", post(subscribe_handler))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
