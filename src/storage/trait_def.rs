use crate::analytics::models::{PageSnapshot, VisitAttributes};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Append one visit to `page_id`, creating the page and session as needed.
    ///
    /// Returns the session id the visit was recorded under (supplied or
    /// generated). A failed call leaves the page unchanged.
    async fn record_visit(&self, page_id: &str, attributes: VisitAttributes) -> Result<String>;

    /// True if the page has at least one recorded visit
    async fn has_data(&self, page_id: &str) -> Result<bool>;

    /// Number of visits recorded for the page
    async fn visit_count(&self, page_id: &str) -> Result<u64>;

    /// Consistent copy of the page's visits and sessions (empty if unknown)
    async fn snapshot(&self, page_id: &str) -> Result<PageSnapshot>;

    /// Number of tracked pages holding data
    async fn page_count(&self) -> Result<usize>;
}
