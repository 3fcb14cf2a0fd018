use crate::error::Result;
use crate::model::{Layer, RelationRecord};
use relgraph_api::DiscoveryApi;
use tracing::debug;

/// Wraps the related-items search into layers whose records point back at
/// the item they were discovered from.
pub struct RelationFetcher<'a, A> {
    api: &'a A,
}

impl<'a, A: DiscoveryApi> RelationFetcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Up to `width` items related to `item`, each with `parent = item`.
    /// Quota exhaustion surfaces as `CrawlError::QuotaExceeded`, every other
    /// API failure as `CrawlError::Fetch`.
    pub async fn related(&self, item: &str, width: usize) -> Result<Layer> {
        let related = self.api.related(item, width).await?;
        debug!("{} related items for {}", related.len(), item);

        Ok(related
            .into_iter()
            .take(width)
            .map(|r| RelationRecord {
                item: r.item_id,
                parent: Some(item.to_string()),
                title: r.title,
                channel: r.channel_id,
            })
            .collect())
    }
}
