use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::{Component, PathBuf};
use std::sync::Arc;

use super::handlers::AppState;
use crate::config::TrackerConfig;

#[derive(RustEmbed)]
#[folder = "public"]
pub struct Assets;

/// Placeholder in the snippet replaced with the configured ping endpoint
const API_URL_PLACEHOLDER: &str = "__PAGEPULSE_API_URL__";

/// Serve the tracking snippet and other public files
pub async fn serve_static(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    let config = &state.tracker;

    // Try to serve from filesystem if static_dir is provided
    if let Some(ref dir) = config.static_dir {
        if let Some(file_path) = safe_join(dir, path) {
            if let Ok(content) = tokio::fs::read(&file_path).await {
                return asset_response(path, content, config);
            }
        }
    }

    // Fall back to embedded assets
    match Assets::get(path) {
        Some(content) => asset_response(path, content.data.into_owned(), config),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Join a request path onto `dir`, refusing anything that climbs out of it
fn safe_join(dir: &str, path: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(path);
    if path.is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(PathBuf::from(dir).join(relative))
}

fn asset_response(path: &str, content: Vec<u8>, config: &TrackerConfig) -> Response {
    let mime = from_path(path).first_or_octet_stream();

    let body = if path.ends_with(".js") {
        match String::from_utf8(content) {
            Ok(script) => script
                .replace(
                    API_URL_PLACEHOLDER,
                    &format!("{}/api/track", config.public_base_url),
                )
                .into_bytes(),
            Err(e) => e.into_bytes(),
        }
    } else {
        content
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        body,
    )
        .into_response()
}
