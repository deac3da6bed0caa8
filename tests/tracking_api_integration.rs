//! Integration tests for the tracking HTTP API
//!
//! Requests go through the full router with `oneshot`; the peer address is
//! supplied with `MockConnectInfo`.

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use pagepulse::analytics::CountryLookup;
use pagepulse::api::{self, AppState};
use pagepulse::config::TrackerConfig;
use pagepulse::storage::{MemoryVisitStore, VisitStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;

const IPHONE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
const DESKTOP_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";

/// Tiny offline country table
struct TestCountries(HashMap<IpAddr, &'static str>);

impl CountryLookup for TestCountries {
    fn country_code(&self, ip: IpAddr) -> Option<String> {
        self.0.get(&ip).map(|code| code.to_string())
    }
}

fn test_countries() -> Arc<TestCountries> {
    let mut table = HashMap::new();
    table.insert("203.0.113.7".parse().unwrap(), "US");
    table.insert("198.51.100.4".parse().unwrap(), "FR");
    Arc::new(TestCountries(table))
}

/// Helper to create the router with a fresh store
fn create_test_app() -> (Router, Arc<dyn VisitStore>) {
    let store: Arc<dyn VisitStore> = Arc::new(MemoryVisitStore::new());
    let tracker = TrackerConfig {
        public_base_url: "https://stats.example.com".to_string(),
        static_dir: None,
    };
    let state = Arc::new(AppState::new(Arc::clone(&store), test_countries(), tracker));

    let app = api::create_router(state)
        .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 7], 40000))));
    (app, store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn send_ping(app: &Router, body: Value, user_agent: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/track")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::USER_AGENT, user_agent)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_track_returns_session_id() {
    let (app, _store) = create_test_app();

    let response = send_ping(
        &app,
        json!({"pageCode": "P1", "referrer": "", "sessionId": "sess_1", "pageUrl": "https://example.com/"}),
        DESKTOP_UA,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["sessionId"], "sess_1");
}

#[tokio::test]
async fn test_track_generates_session_id_when_absent() {
    let (app, _store) = create_test_app();

    let response = send_ping(&app, json!({"pageCode": "P1"}), DESKTOP_UA).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let session_id = json["sessionId"].as_str().unwrap();
    assert!(!session_id.is_empty());
}

#[tokio::test]
async fn test_track_without_page_code_is_rejected() {
    let (app, store) = create_test_app();

    let response = send_ping(&app, json!({"referrer": "", "sessionId": "A"}), DESKTOP_UA).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "pageCode is required");
    assert_eq!(store.page_count().await.unwrap(), 0);
}

async fn send_raw_ping(app: &Router, content_type: Option<&str>, body: &str) -> axum::response::Response {
    let mut request = Request::builder().method("POST").uri("/api/track");
    if let Some(content_type) = content_type {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    app.clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_track_malformed_bodies_get_json_errors() {
    let (app, store) = create_test_app();

    let cases = [
        (None, r#"{"pageCode":"P1"}"#),
        (Some("application/json"), ""),
        (Some("application/json"), "{not json"),
        (Some("application/json"), r#"{"pageCode":42}"#),
    ];

    for (content_type, body) in cases {
        let response = send_raw_ping(&app, content_type, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body:?}");

        let json = body_json(response).await;
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("invalid request body"), "error: {error}");
    }

    assert_eq!(store.page_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_page_verify_and_stats() {
    let (app, _store) = create_test_app();

    let response = get(&app, "/api/verify/unknown-page").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["verified"], false);
    assert!(json.get("dataPoints").is_none());

    let response = get(&app, "/api/stats/unknown-page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No data available for this page code");
}

#[tokio::test]
async fn test_two_session_scenario() {
    let (app, _store) = create_test_app();

    send_ping(&app, json!({"pageCode": "P1", "referrer": "", "sessionId": "A"}), IPHONE_UA).await;
    send_ping(&app, json!({"pageCode": "P1", "referrer": "", "sessionId": "A"}), IPHONE_UA).await;
    send_ping(
        &app,
        json!({"pageCode": "P1", "referrer": "https://google.com/search", "sessionId": "B"}),
        DESKTOP_UA,
    )
    .await;

    let response = get(&app, "/api/verify/P1").await;
    let json = body_json(response).await;
    assert_eq!(json["verified"], true);
    assert_eq!(json["dataPoints"], 3);

    let response = get(&app, "/api/stats/P1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;

    assert_eq!(stats["totalVisitors"], 2);
    assert_eq!(stats["pageViews"], 3);
    assert_eq!(stats["bounceRate"], 50.0);
    assert_eq!(stats["pagesPerSession"], 1.5);
    assert_eq!(stats["visitorTrend"].as_array().unwrap().len(), 30);
    assert_eq!(stats["visitorTrend"][29]["visitors"], 3);
    assert!(stats["peakTrafficHour"].is_string());

    let sources = stats["trafficSources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources.contains(&json!({"name": "Direct", "value": 50})));
    assert!(sources.contains(&json!({"name": "Organic Search", "value": 50})));

    let devices = stats["deviceTypes"].as_array().unwrap();
    assert!(devices.contains(&json!({"name": "Mobile", "value": 50})));
    assert!(devices.contains(&json!({"name": "Desktop", "value": 50})));

    assert_eq!(stats["countries"], json!([{"name": "US", "count": 2}]));
    assert_eq!(
        stats["topReferrers"],
        json!([{"url": "https://google.com/search", "count": 1}])
    );
}

#[tokio::test]
async fn test_forwarded_for_header_drives_country() {
    let (app, _store) = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .body(Body::from(json!({"pageCode": "P1", "sessionId": "A"}).to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-real-ip", "127.0.0.1")
        .body(Body::from(json!({"pageCode": "P1", "sessionId": "B"}).to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap();

    let stats = body_json(get(&app, "/api/stats/P1").await).await;
    assert_eq!(
        stats["countries"],
        json!([{"name": "FR", "count": 1}, {"name": "Local", "count": 1}])
    );
}

#[tokio::test]
async fn test_stats_reads_are_idempotent() {
    let (app, _store) = create_test_app();

    send_ping(&app, json!({"pageCode": "P1", "sessionId": "A"}), DESKTOP_UA).await;

    let first = body_json(get(&app, "/api/stats/P1").await).await;
    let second = body_json(get(&app, "/api/stats/P1").await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_health_reports_tracked_pages() {
    let (app, _store) = create_test_app();

    send_ping(&app, json!({"pageCode": "P1"}), DESKTOP_UA).await;
    send_ping(&app, json!({"pageCode": "P2"}), DESKTOP_UA).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["trackedPages"], 2);
}

#[tokio::test]
async fn test_tracker_script_points_at_configured_api() {
    let (app, _store) = create_test_app();

    let response = get(&app, "/tracker.js").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let script = String::from_utf8(body.to_vec()).unwrap();
    assert!(script.contains("https://stats.example.com/api/track"));
    assert!(!script.contains("__PAGEPULSE_API_URL__"));

    let response = get(&app, "/missing.js").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
