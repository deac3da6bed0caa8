use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pagepulse::analytics::GeoIpService;
use pagepulse::api::{self, AppState};
use pagepulse::config::Config;
use pagepulse::storage::{MemoryVisitStore, VisitStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Load the GeoIP database once; it is read-only afterwards
    let geoip = GeoIpService::new(config.geoip.db_path.as_deref())?;
    if geoip.is_loaded() {
        info!(
            "🌍 GeoIP database loaded from {}",
            config.geoip.db_path.as_deref().unwrap_or_default()
        );
    } else {
        warn!("GEOIP_DB_PATH not set - visitor countries will be reported as Unknown");
    }

    // Visit data lives in memory and is lost on restart
    let store: Arc<dyn VisitStore> = Arc::new(MemoryVisitStore::new());

    let state = Arc::new(AppState::new(store, Arc::new(geoip), config.tracker.clone()));
    let router = api::create_router(state);

    info!(
        "CORS: tracker accepts all origins (configured dashboard origins: {})",
        config.cors.allowed_origins.join(", ")
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Visitor tracking server listening on http://{}", addr);
    info!("   - POST /api/track");
    info!("   - GET  /api/stats/{{pageCode}}");
    info!("   - GET  /api/verify/{{pageCode}}");
    info!("   - GET  /health");
    info!(
        "   - Tracking script: {}/tracker.js?id=YOUR_PAGE_CODE",
        config.tracker.public_base_url
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
