pub mod client;
pub mod embed;
pub mod error;
pub mod types;

pub use client::DiscoveryClient;
pub use embed::EmbedClient;
pub use error::{ApiError, Result};
pub use types::{EmbedEndpoint, RelatedItem, VideoInfo};

/// The authoritative, quota-bearing side of the platform.
#[allow(async_fn_in_trait)]
pub trait DiscoveryApi {
    /// Title and channel of one item. `ApiError::NotFound` when the platform
    /// does not know the id.
    async fn video_info(&self, item_id: &str) -> Result<VideoInfo>;

    /// Up to `width` items related to `item_id`, in the platform's order.
    async fn related(&self, item_id: &str, width: usize) -> Result<Vec<RelatedItem>>;
}

/// Quota-free, best-effort channel naming. Never fails; `None` means the
/// endpoint could not name the channel.
#[allow(async_fn_in_trait)]
pub trait ChannelNameLookup {
    async fn channel_name(&self, item_id: &str, endpoint: EmbedEndpoint) -> Option<String>;
}

impl<T: DiscoveryApi> DiscoveryApi for &T {
    async fn video_info(&self, item_id: &str) -> Result<VideoInfo> {
        (**self).video_info(item_id).await
    }

    async fn related(&self, item_id: &str, width: usize) -> Result<Vec<RelatedItem>> {
        (**self).related(item_id, width).await
    }
}

impl<T: ChannelNameLookup> ChannelNameLookup for &T {
    async fn channel_name(&self, item_id: &str, endpoint: EmbedEndpoint) -> Option<String> {
        (**self).channel_name(item_id, endpoint).await
    }
}
