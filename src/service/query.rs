use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::analytics::{compute_stats, TrafficStats};
use crate::service::{TrackingError, TrackingResult};
use crate::storage::VisitStore;

/// Result of an install check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub verified: bool,
    pub data_points: Option<u64>,
}

/// Answers verification and stats requests from a store snapshot
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn VisitStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn VisitStore>) -> Self {
        Self { store }
    }

    pub async fn verify(&self, page_code: &str) -> TrackingResult<Verification> {
        let count = self.store.visit_count(page_code).await?;
        let verified = count > 0;
        info!(page_code = %page_code, verified, "verification check");

        Ok(Verification {
            verified,
            data_points: verified.then_some(count),
        })
    }

    pub async fn stats(&self, page_code: &str) -> TrackingResult<TrafficStats> {
        let snapshot = self.store.snapshot(page_code).await?;
        if snapshot.is_empty() {
            return Err(TrackingError::NoData(page_code.to_string()));
        }

        let stats = compute_stats(&snapshot, Utc::now());
        info!(
            page_code = %page_code,
            visitors = stats.total_visitors,
            page_views = stats.page_views,
            "returning stats"
        );

        Ok(stats)
    }

    /// Number of tracked pages holding data
    pub async fn tracked_pages(&self) -> TrackingResult<usize> {
        Ok(self.store.page_count().await?)
    }
}
