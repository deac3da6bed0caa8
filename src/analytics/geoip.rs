//! Country lookup using a MaxMind GeoLite2/GeoIP2 MMDB
//!
//! The database is memory-mapped once at startup and only read afterwards.

use anyhow::{Context, Result};
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::ip_extractor::{extract_client_ip, is_local, AddressCandidates};
use crate::analytics::models::Country;

/// Offline IP-to-country table
pub trait CountryLookup: Send + Sync {
    /// ISO country code for an address, if the table knows it
    fn country_code(&self, ip: IpAddr) -> Option<String>;
}

/// GeoIP lookup service backed by an optional Country or City database
#[derive(Clone, Default)]
pub struct GeoIpService {
    reader: Option<Arc<Reader<Mmap>>>,
}

impl GeoIpService {
    /// Open the MMDB file at `path`. With no path every lookup misses.
    pub fn new(path: Option<&str>) -> Result<Self> {
        let reader = if let Some(path) = path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self { reader })
    }

    /// True when a database was opened
    pub fn is_loaded(&self) -> bool {
        self.reader.is_some()
    }
}

impl CountryLookup for GeoIpService {
    fn country_code(&self, ip: IpAddr) -> Option<String> {
        let reader = self.reader.as_ref()?;

        // geoip2::Country decodes from both Country and City databases
        match reader.lookup(ip) {
            Ok(result) => match result.decode::<geoip2::Country>() {
                Ok(Some(country)) => country.country.iso_code.map(|s| s.to_string()),
                Ok(None) => None,
                Err(e) => {
                    debug!(%ip, error = %e, "failed to decode GeoIP record");
                    None
                }
            },
            Err(e) => {
                debug!(%ip, error = %e, "GeoIP lookup failed");
                None
            }
        }
    }
}

/// Resolve the visitor's country from the request address candidates.
///
/// Loopback resolves to `Local`; no usable address or a table miss resolves
/// to `Unknown`.
pub fn resolve_country(lookup: &dyn CountryLookup, candidates: &AddressCandidates) -> Country {
    let Some(ip) = extract_client_ip(candidates) else {
        return Country::Unknown;
    };

    if is_local(ip) {
        return Country::Local;
    }

    lookup
        .country_code(ip)
        .map(Country::Code)
        .unwrap_or(Country::Unknown)
}
