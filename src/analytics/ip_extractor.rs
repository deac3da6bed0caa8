//! Client IP extraction from proxy headers and the socket address
//!
//! Candidates are tried in a fixed order:
//! - first entry of `X-Forwarded-For`
//! - `X-Real-IP`
//! - the socket remote address

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Raw address candidates captured from one request
#[derive(Debug, Clone, Default)]
pub struct AddressCandidates {
    pub forwarded_for: Option<String>,
    pub real_ip: Option<String>,
    pub socket_ip: Option<IpAddr>,
}

impl AddressCandidates {
    /// Capture the candidate headers from a request
    pub fn from_headers(headers: &HeaderMap, socket_ip: Option<IpAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        };

        Self {
            forwarded_for: header("x-forwarded-for"),
            real_ip: header("x-real-ip"),
            socket_ip,
        }
    }

    /// Candidate for tests and non-HTTP callers that only know the peer
    pub fn from_socket(socket_ip: IpAddr) -> Self {
        Self {
            socket_ip: Some(socket_ip),
            ..Default::default()
        }
    }
}

/// Pick the first usable client address, or `None` when nothing parses
pub fn extract_client_ip(candidates: &AddressCandidates) -> Option<IpAddr> {
    let forwarded = candidates
        .forwarded_for
        .as_deref()
        .and_then(|xff| xff.split(',').next())
        .and_then(parse_ip);

    forwarded
        .or_else(|| candidates.real_ip.as_deref().and_then(parse_ip))
        .or(candidates.socket_ip)
}

/// Parse an address that may carry a port or IPv6 brackets
fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Loopback addresses, including IPv4-mapped IPv6 loopback (`::ffff:127.x.x.x`)
pub fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => addr.is_loopback(),
        IpAddr::V6(addr) => {
            addr.is_loopback()
                || addr
                    .to_ipv4_mapped()
                    .is_some_and(|mapped| mapped.is_loopback())
        }
    }
}
