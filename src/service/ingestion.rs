use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::analytics::models::VisitAttributes;
use crate::analytics::{
    classify_device, classify_source, resolve_country, AddressCandidates, CountryLookup,
};
use crate::service::{TrackingError, TrackingResult};
use crate::storage::VisitStore;

/// Fields sent by the tracking snippet
#[derive(Debug, Clone, Default)]
pub struct TrackPayload {
    pub page_code: Option<String>,
    pub referrer: Option<String>,
    pub session_id: Option<String>,
    pub page_url: Option<String>,
}

/// Request metadata the payload does not carry
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_agent: String,
    pub addresses: AddressCandidates,
}

/// Records incoming pings. Repeated deliveries are not deduplicated.
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn VisitStore>,
    geoip: Arc<dyn CountryLookup>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn VisitStore>, geoip: Arc<dyn CountryLookup>) -> Self {
        Self { store, geoip }
    }

    /// Record one ping and return the session id to echo back to the client
    pub async fn track(
        &self,
        payload: TrackPayload,
        context: &RequestContext,
    ) -> TrackingResult<String> {
        let page_code = payload
            .page_code
            .filter(|code| !code.is_empty())
            .ok_or(TrackingError::MissingPageCode)?;

        let referrer = payload.referrer.unwrap_or_default();
        let attributes = VisitAttributes {
            received_at: Utc::now(),
            session_id: payload.session_id,
            device: classify_device(&context.user_agent),
            source: classify_source(&referrer),
            country: resolve_country(self.geoip.as_ref(), &context.addresses),
            referrer,
            page_url: payload.page_url.unwrap_or_default(),
            user_agent: context.user_agent.clone(),
        };

        let session_id = self.store.record_visit(&page_code, attributes).await?;
        info!(page_code = %page_code, session_id = %session_id, "received ping");

        Ok(session_id)
    }
}
