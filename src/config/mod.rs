use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub tracker: TrackerConfig,
    pub geoip: GeoIpConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Base URL the tracking snippet posts pings to
    pub public_base_url: String,
    /// Path to directory whose files override the embedded snippet
    /// If None, only embedded assets are served
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// Path to a GeoLite2 Country or City .mmdb file
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    const DEFAULT_PORT: u16 = 3002;
}

impl CorsConfig {
    fn default_origins() -> Vec<String> {
        vec![
            "http://localhost:5173".to_string(),
            "http://localhost:3000".to_string(),
        ]
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(value) => value.parse::<u16>()?,
            Err(_) => ServerConfig::DEFAULT_PORT,
        };

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let static_dir = std::env::var("TRACKER_STATIC_DIR").ok();

        let db_path = std::env::var("GEOIP_DB_PATH")
            .ok()
            .filter(|path| !path.is_empty());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| CorsConfig::default_origins());

        Ok(Config {
            server: ServerConfig { host, port },
            tracker: TrackerConfig {
                public_base_url,
                static_dir,
            },
            geoip: GeoIpConfig { db_path },
            cors: CorsConfig { allowed_origins },
        })
    }
}
