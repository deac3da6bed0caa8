//! Request attribute classification (device type and traffic source)

use crate::analytics::models::{DeviceType, SourceCategory};

const HANDHELD_MARKERS: &[&str] = &["mobile", "android", "iphone", "ipad", "ipod"];
const TABLET_MARKERS: &[&str] = &["ipad", "tablet"];

const SEARCH_ENGINES: &[&str] = &["google", "bing", "yahoo", "duckduckgo", "baidu"];
const SOCIAL_PLATFORMS: &[&str] = &[
    "facebook",
    "twitter",
    "instagram",
    "linkedin",
    "pinterest",
    "reddit",
    "tiktok",
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classify a User-Agent string. An empty agent counts as desktop.
pub fn classify_device(user_agent: &str) -> DeviceType {
    let ua = user_agent.to_lowercase();

    if !contains_any(&ua, HANDHELD_MARKERS) {
        return DeviceType::Desktop;
    }

    if contains_any(&ua, TABLET_MARKERS) {
        DeviceType::Tablet
    } else {
        DeviceType::Mobile
    }
}

/// Classify a referrer URL. Search engines win over social platforms.
pub fn classify_source(referrer: &str) -> SourceCategory {
    if referrer.is_empty() {
        return SourceCategory::Direct;
    }

    let referrer = referrer.to_lowercase();
    if contains_any(&referrer, SEARCH_ENGINES) {
        SourceCategory::OrganicSearch
    } else if contains_any(&referrer, SOCIAL_PLATFORMS) {
        SourceCategory::SocialMedia
    } else {
        SourceCategory::Referral
    }
}
