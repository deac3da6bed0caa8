use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::{AddressCandidates, CountryLookup, TrafficStats};
use crate::config::TrackerConfig;
use crate::service::{IngestionService, QueryService, RequestContext, TrackPayload, TrackingError};
use crate::storage::VisitStore;

pub struct AppState {
    pub ingestion: IngestionService,
    pub query: QueryService,
    pub tracker: TrackerConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VisitStore>,
        geoip: Arc<dyn CountryLookup>,
        tracker: TrackerConfig,
    ) -> Self {
        Self {
            ingestion: IngestionService::new(Arc::clone(&store), geoip),
            query: QueryService::new(store),
            tracker,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: TrackingError) -> ApiError {
    let (status, message) = match err {
        TrackingError::MissingPageCode => (
            StatusCode::BAD_REQUEST,
            "pageCode is required".to_string(),
        ),
        TrackingError::InvalidBody(detail) => (
            StatusCode::BAD_REQUEST,
            format!("invalid request body: {}", detail),
        ),
        TrackingError::NoData(_) => (
            StatusCode::NOT_FOUND,
            "No data available for this page code".to_string(),
        ),
        TrackingError::Internal(e) => {
            tracing::error!(error = %e, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse { error: message }))
}

/// Ping body sent by the tracking snippet; unknown fields are ignored
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub page_code: Option<String>,
    pub referrer: Option<String>,
    pub session_id: Option<String>,
    pub page_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_points: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub tracked_pages: usize,
}

/// Receive one ping from the tracking snippet
pub async fn track(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<TrackResponse>, ApiError> {
    let Json(payload) = payload
        .map_err(|rejection| error_response(TrackingError::InvalidBody(rejection.body_text())))?;

    let context = RequestContext {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        addresses: AddressCandidates::from_headers(&headers, Some(addr.ip())),
    };

    let payload = TrackPayload {
        page_code: payload.page_code,
        referrer: payload.referrer,
        session_id: payload.session_id,
        page_url: payload.page_url,
    };

    let session_id = state
        .ingestion
        .track(payload, &context)
        .await
        .map_err(error_response)?;

    Ok(Json(TrackResponse {
        success: true,
        message: "Tracking data received".to_string(),
        session_id,
    }))
}

/// Check whether the tracking snippet has delivered any data
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(page_code): Path<String>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let verification = state
        .query
        .verify(&page_code)
        .await
        .map_err(error_response)?;

    let message = if verification.verified {
        "Tracking code is installed and receiving data"
    } else {
        "No data received yet. Please ensure the tracking code is installed."
    };

    Ok(Json(VerifyResponse {
        verified: verification.verified,
        message: message.to_string(),
        data_points: verification.data_points,
    }))
}

/// Aggregated statistics for a page
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(page_code): Path<String>,
) -> Result<Json<TrafficStats>, ApiError> {
    state
        .query
        .stats(&page_code)
        .await
        .map(Json)
        .map_err(error_response)
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let tracked_pages = state
        .query
        .tracked_pages()
        .await
        .map_err(error_response)?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tracked_pages,
    }))
}
