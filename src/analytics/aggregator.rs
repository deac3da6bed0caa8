//! Stats aggregation over a page snapshot
//!
//! Pure computation: the aggregator never touches the store, it only reads a
//! snapshot that was copied out under the page lock. Calendar days are taken
//! in UTC.
//!
//! `peakTrafficHour` is a UTC hour of day, not the server's local time.

use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};
use std::collections::HashMap;

use crate::analytics::models::{
    CategoryShare, CountryCount, DailyVisitors, PageSnapshot, ReferrerCount, TrafficStats,
};

/// Number of days in the visitor trend, ending today
pub const TREND_DAYS: usize = 30;
pub const TOP_COUNTRIES: usize = 10;
pub const TOP_REFERRERS: usize = 5;

/// Counts keys while remembering the order they were first seen in.
///
/// Ranking uses a stable sort, so equal counts keep discovery order.
struct OrderedCounter<'a> {
    index: HashMap<&'a str, usize>,
    entries: Vec<(&'a str, u64)>,
}

impl<'a> OrderedCounter<'a> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: &'a str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Entries in discovery order
    fn into_entries(self) -> Vec<(&'a str, u64)> {
        self.entries
    }

    /// Highest counts first, at most `limit` entries
    fn ranked(mut self, limit: usize) -> Vec<(&'a str, u64)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.truncate(limit);
        self.entries
    }

    /// Integer percentage of each key, rounded independently
    fn shares(self) -> Vec<CategoryShare> {
        let total = self.total();
        self.into_entries()
            .into_iter()
            .map(|(name, count)| CategoryShare {
                name: name.to_string(),
                value: if total > 0 {
                    (count as f64 / total as f64 * 100.0).round() as u32
                } else {
                    0
                },
            })
            .collect()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Label used for a trend bucket, e.g. "Oct 19"
pub fn day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Compute the stats payload for one page as of `now`.
pub fn compute_stats(snapshot: &PageSnapshot, now: DateTime<Utc>) -> TrafficStats {
    let sessions = &snapshot.sessions;
    let visits = &snapshot.visits;

    let total_visitors = sessions.len() as u64;
    let page_views = visits.len() as u64;

    let (bounce_rate, avg_session_duration, pages_per_session) = if total_visitors > 0 {
        let visitors = total_visitors as f64;
        let bounced = sessions.iter().filter(|s| s.is_bounced()).count() as f64;
        let total_minutes: f64 = sessions.iter().map(|s| s.duration_minutes()).sum();

        (
            round_to(bounced / visitors * 100.0, 1),
            round_to(total_minutes / visitors, 2),
            round_to(page_views as f64 / visitors, 2),
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let mut sources = OrderedCounter::new();
    let mut devices = OrderedCounter::new();
    let mut countries = OrderedCounter::new();
    for session in sessions {
        sources.add(session.source.as_str());
        devices.add(session.device.as_str());
        countries.add(session.country.as_str());
    }

    let mut referrers = OrderedCounter::new();
    for visit in visits.iter().filter(|v| !v.referrer.is_empty()) {
        referrers.add(&visit.referrer);
    }

    TrafficStats {
        total_visitors,
        page_views,
        bounce_rate,
        avg_session_duration,
        pages_per_session,
        peak_traffic_hour: peak_hour(snapshot),
        visitor_trend: visitor_trend(snapshot, now),
        traffic_sources: sources.shares(),
        device_types: devices.shares(),
        countries: countries
            .ranked(TOP_COUNTRIES)
            .into_iter()
            .map(|(name, count)| CountryCount {
                name: name.to_string(),
                count,
            })
            .collect(),
        top_referrers: referrers
            .ranked(TOP_REFERRERS)
            .into_iter()
            .map(|(url, count)| ReferrerCount {
                url: url.to_string(),
                count,
            })
            .collect(),
    }
}

/// Visits per calendar day for the trailing window, oldest first
fn visitor_trend(snapshot: &PageSnapshot, now: DateTime<Utc>) -> Vec<DailyVisitors> {
    let today = now.date_naive();
    let mut buckets = [0u64; TREND_DAYS];

    for visit in &snapshot.visits {
        let days_ago = (today - visit.timestamp.date_naive()).num_days();
        if (0..TREND_DAYS as i64).contains(&days_ago) {
            buckets[TREND_DAYS - 1 - days_ago as usize] += 1;
        }
    }

    buckets
        .iter()
        .enumerate()
        .map(|(i, &visitors)| {
            let days_ago = (TREND_DAYS - 1 - i) as u64;
            let date = today.checked_sub_days(Days::new(days_ago)).unwrap_or(today);
            DailyVisitors {
                day: day_label(date),
                visitors,
            }
        })
        .collect()
}

/// Busiest hour of day across all visits; ties go to the earliest hour
fn peak_hour(snapshot: &PageSnapshot) -> Option<String> {
    let mut hours = [0u64; 24];
    for visit in &snapshot.visits {
        hours[visit.timestamp.hour() as usize] += 1;
    }

    let mut peak: Option<(usize, u64)> = None;
    for (hour, &count) in hours.iter().enumerate() {
        if count > 0 && peak.map_or(true, |(_, best)| count > best) {
            peak = Some((hour, count));
        }
    }

    peak.map(|(hour, _)| format!("{:02}:00", hour))
}
