//! Ingestion and query orchestration over the visit store

pub mod error;
pub mod ingestion;
pub mod query;

pub use error::{TrackingError, TrackingResult};
pub use ingestion::{IngestionService, RequestContext, TrackPayload};
pub use query::{QueryService, Verification};
