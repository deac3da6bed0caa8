use crate::analytics::models::{PageSnapshot, Session, Visit, VisitAttributes};
use crate::storage::VisitStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// All analytics for one tracked page
#[derive(Debug)]
struct PageAnalytics {
    visits: Vec<Visit>,
    /// Creation order, so "first seen" ties stay deterministic
    sessions: Vec<Session>,
    session_index: HashMap<String, usize>,
    first_visit: DateTime<Utc>,
    last_visit: DateTime<Utc>,
}

impl PageAnalytics {
    fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            visits: Vec::new(),
            sessions: Vec::new(),
            session_index: HashMap::new(),
            first_visit: created_at,
            last_visit: created_at,
        }
    }

    /// Apply one visit. Caller holds the write lock, so the session update
    /// and the append are observed together.
    fn apply(&mut self, visit: Visit) {
        match self.session_index.get(&visit.session_id) {
            Some(&i) => {
                let session = &mut self.sessions[i];
                session.last_activity = session.last_activity.max(visit.timestamp);
                session.page_views += 1;
            }
            None => {
                self.session_index
                    .insert(visit.session_id.clone(), self.sessions.len());
                self.sessions.push(Session {
                    session_id: visit.session_id.clone(),
                    start_time: visit.timestamp,
                    last_activity: visit.timestamp,
                    page_views: 1,
                    device: visit.device,
                    source: visit.source,
                    country: visit.country.clone(),
                });
            }
        }

        self.last_visit = self.last_visit.max(visit.timestamp);
        self.visits.push(visit);
    }

    fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            visits: self.visits.clone(),
            sessions: self.sessions.clone(),
            first_visit: Some(self.first_visit),
            last_visit: Some(self.last_visit),
        }
    }
}

/// Volatile in-memory visit store.
///
/// Each page sits behind its own lock; the outer map only serialises page
/// creation, so different pages never contend.
#[derive(Default)]
pub struct MemoryVisitStore {
    pages: DashMap<String, Arc<RwLock<PageAnalytics>>>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn page(&self, page_id: &str) -> Option<Arc<RwLock<PageAnalytics>>> {
        self.pages.get(page_id).map(|entry| Arc::clone(entry.value()))
    }

    fn page_or_create(&self, page_id: &str, now: DateTime<Utc>) -> Arc<RwLock<PageAnalytics>> {
        // Fast path avoids taking the shard write lock for known pages
        if let Some(page) = self.page(page_id) {
            return page;
        }

        let entry = self
            .pages
            .entry(page_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(PageAnalytics::new(now))));
        Arc::clone(entry.value())
    }
}

fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn record_visit(&self, page_id: &str, attributes: VisitAttributes) -> Result<String> {
        let session_id = attributes
            .session_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_session_id);

        let visit = Visit {
            page_id: page_id.to_string(),
            timestamp: attributes.received_at,
            session_id: session_id.clone(),
            device: attributes.device,
            source: attributes.source,
            country: attributes.country,
            referrer: attributes.referrer,
            page_url: attributes.page_url,
            user_agent: attributes.user_agent,
        };

        let page = self.page_or_create(page_id, attributes.received_at);
        page.write().await.apply(visit);

        Ok(session_id)
    }

    async fn has_data(&self, page_id: &str) -> Result<bool> {
        Ok(self.visit_count(page_id).await? > 0)
    }

    async fn visit_count(&self, page_id: &str) -> Result<u64> {
        match self.page(page_id) {
            Some(page) => Ok(page.read().await.visits.len() as u64),
            None => Ok(0),
        }
    }

    async fn snapshot(&self, page_id: &str) -> Result<PageSnapshot> {
        match self.page(page_id) {
            Some(page) => Ok(page.read().await.snapshot()),
            None => Ok(PageSnapshot::default()),
        }
    }

    async fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::models::{Country, DeviceType, SourceCategory};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 19, 12, 0, 0).unwrap()
    }

    fn attributes(session_id: Option<&str>, at: DateTime<Utc>) -> VisitAttributes {
        VisitAttributes {
            received_at: at,
            session_id: session_id.map(str::to_string),
            referrer: String::new(),
            page_url: "https://example.com/".to_string(),
            user_agent: String::new(),
            device: DeviceType::Desktop,
            source: SourceCategory::Direct,
            country: Country::Unknown,
        }
    }

    #[tokio::test]
    async fn test_unknown_page_is_empty() {
        let store = MemoryVisitStore::new();
        assert!(!store.has_data("missing").await.unwrap());
        assert_eq!(store.visit_count("missing").await.unwrap(), 0);

        let snapshot = store.snapshot("missing").await.unwrap();
        assert!(snapshot.visits.is_empty());
        assert!(snapshot.sessions.is_empty());
        assert_eq!(store.page_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_session_created_then_updated() {
        let store = MemoryVisitStore::new();
        let t0 = start();

        let id = store
            .record_visit("P1", attributes(Some("A"), t0))
            .await
            .unwrap();
        assert_eq!(id, "A");

        let mut second = attributes(Some("A"), t0 + Duration::minutes(3));
        second.device = DeviceType::Mobile;
        store.record_visit("P1", second).await.unwrap();

        let snapshot = store.snapshot("P1").await.unwrap();
        assert_eq!(snapshot.visits.len(), 2);
        assert_eq!(snapshot.sessions.len(), 1);

        let session = &snapshot.sessions[0];
        assert_eq!(session.page_views, 2);
        assert_eq!(session.start_time, t0);
        assert_eq!(session.last_activity, t0 + Duration::minutes(3));
        // Attributes come from the first visit
        assert_eq!(session.device, DeviceType::Desktop);

        assert_eq!(snapshot.first_visit, Some(t0));
        assert_eq!(snapshot.last_visit, Some(t0 + Duration::minutes(3)));
    }

    #[tokio::test]
    async fn test_missing_session_id_is_generated() {
        let store = MemoryVisitStore::new();

        let first = store.record_visit("P1", attributes(None, start())).await.unwrap();
        let second = store
            .record_visit("P1", attributes(Some(""), start()))
            .await
            .unwrap();

        assert!(!first.is_empty());
        assert_ne!(first, second);
        assert_eq!(store.snapshot("P1").await.unwrap().sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_last_activity_never_moves_backwards() {
        let store = MemoryVisitStore::new();
        let t0 = start();

        store.record_visit("P1", attributes(Some("A"), t0)).await.unwrap();
        store
            .record_visit("P1", attributes(Some("A"), t0 - Duration::seconds(5)))
            .await
            .unwrap();

        let snapshot = store.snapshot("P1").await.unwrap();
        assert_eq!(snapshot.sessions[0].last_activity, t0);
    }

    #[tokio::test]
    async fn test_pages_are_isolated() {
        let store = MemoryVisitStore::new();
        store.record_visit("P1", attributes(Some("A"), start())).await.unwrap();
        store.record_visit("P2", attributes(Some("A"), start())).await.unwrap();
        store.record_visit("P2", attributes(Some("B"), start())).await.unwrap();

        assert_eq!(store.visit_count("P1").await.unwrap(), 1);
        assert_eq!(store.visit_count("P2").await.unwrap(), 2);
        assert_eq!(store.snapshot("P1").await.unwrap().sessions.len(), 1);
        assert_eq!(store.page_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sessions_keep_creation_order() {
        let store = MemoryVisitStore::new();
        for id in ["z", "a", "m", "a", "z"] {
            store.record_visit("P1", attributes(Some(id), start())).await.unwrap();
        }

        let snapshot = store.snapshot("P1").await.unwrap();
        let ids: Vec<&str> = snapshot
            .sessions
            .iter()
            .map(|s| s.session_id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
