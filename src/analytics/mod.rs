//! Visit analytics: classification, geolocation and stats aggregation
//!
//! Everything here is synchronous and in-process. Country lookups use an
//! optional MaxMind GeoLite2 MMDB; without one, public addresses resolve to
//! `Unknown`.

pub mod aggregator;
pub mod classifier;
pub mod geoip;
pub mod ip_extractor;
pub mod models;

pub use aggregator::compute_stats;
pub use classifier::{classify_device, classify_source};
pub use geoip::{resolve_country, CountryLookup, GeoIpService};
pub use ip_extractor::{extract_client_ip, AddressCandidates};
pub use models::{Country, DeviceType, PageSnapshot, SourceCategory, TrafficStats};
