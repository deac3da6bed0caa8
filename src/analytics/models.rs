//! Data models for visit analytics

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Device category derived from the User-Agent header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "Desktop",
            DeviceType::Mobile => "Mobile",
            DeviceType::Tablet => "Tablet",
        }
    }
}

/// Traffic source category derived from the referrer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceCategory {
    Direct,
    #[serde(rename = "Organic Search")]
    OrganicSearch,
    #[serde(rename = "Social Media")]
    SocialMedia,
    Referral,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceCategory::Direct => "Direct",
            SourceCategory::OrganicSearch => "Organic Search",
            SourceCategory::SocialMedia => "Social Media",
            SourceCategory::Referral => "Referral",
        }
    }
}

/// Country of a visitor, or a sentinel when it cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Country {
    /// ISO country code (e.g., "US", "GB")
    Code(String),
    /// Loopback address, typically local development
    Local,
    /// No usable address, or the lookup table has no entry
    Unknown,
}

impl Country {
    pub fn as_str(&self) -> &str {
        match self {
            Country::Code(code) => code,
            Country::Local => "Local",
            Country::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Country {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single recorded page view. Immutable once stored.
#[derive(Debug, Clone)]
pub struct Visit {
    pub page_id: String,
    /// Server receive time
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub device: DeviceType,
    pub source: SourceCategory,
    pub country: Country,
    pub referrer: String,
    pub page_url: String,
    pub user_agent: String,
}

/// Per-session state within one tracked page
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub page_views: u64,
    // Captured from the first visit only
    pub device: DeviceType,
    pub source: SourceCategory,
    pub country: Country,
}

impl Session {
    pub fn is_bounced(&self) -> bool {
        self.page_views == 1
    }

    /// Session length in minutes; zero for a single-visit session
    pub fn duration_minutes(&self) -> f64 {
        (self.last_activity - self.start_time).num_milliseconds() as f64 / 60_000.0
    }
}

/// Everything the store needs to append one visit.
///
/// Device, source and country are already classified by the caller.
#[derive(Debug, Clone)]
pub struct VisitAttributes {
    pub received_at: DateTime<Utc>,
    pub session_id: Option<String>,
    pub referrer: String,
    pub page_url: String,
    pub user_agent: String,
    pub device: DeviceType,
    pub source: SourceCategory,
    pub country: Country,
}

/// Consistent read-only copy of one page's data
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// Arrival order
    pub visits: Vec<Visit>,
    /// Creation order
    pub sessions: Vec<Session>,
    pub first_visit: Option<DateTime<Utc>>,
    pub last_visit: Option<DateTime<Utc>>,
}

impl PageSnapshot {
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

/// One day of the visitor trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyVisitors {
    pub day: String,
    pub visitors: u64,
}

/// Percentage share of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferrerCount {
    pub url: String,
    pub count: u64,
}

/// Aggregated statistics for one tracked page.
///
/// Numbers are already rounded and lists already ranked; consumers must not
/// re-aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStats {
    pub total_visitors: u64,
    pub page_views: u64,
    pub bounce_rate: f64,
    /// Minutes
    pub avg_session_duration: f64,
    pub pages_per_session: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_traffic_hour: Option<String>,
    pub visitor_trend: Vec<DailyVisitors>,
    pub traffic_sources: Vec<CategoryShare>,
    pub device_types: Vec<CategoryShare>,
    pub countries: Vec<CountryCount>,
    pub top_referrers: Vec<ReferrerCount>,
}
