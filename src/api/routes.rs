use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::handlers::{health_check, stats, track, verify, AppState};
use super::static_files::serve_static;

/// The snippet runs on arbitrary customer sites, so every origin is allowed
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/track", post(track))
        .route("/api/verify/{page_code}", get(verify))
        .route("/api/stats/{page_code}", get(stats))
        .route("/health", get(health_check))
        .fallback(serve_static)
        .layer(cors_layer())
        .with_state(state)
}
