use crate::ChannelNameLookup;
use crate::error::Result;
use crate::types::{EmbedEndpoint, EmbedResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OEMBED_URL: &str = "https://www.youtube.com/oembed";
pub const DEFAULT_NOEMBED_URL: &str = "https://noembed.com/embed";
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Best-effort channel naming through the public embed endpoints. Neither
/// endpoint needs a key, so lookups never touch the discovery quota; they do
/// have their own rate limits, which is why callers rotate between them.
pub struct EmbedClient {
    client: Client,
    oembed_url: String,
    noembed_url: String,
}

impl EmbedClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("relgraph/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            oembed_url: DEFAULT_OEMBED_URL.to_string(),
            noembed_url: DEFAULT_NOEMBED_URL.to_string(),
        })
    }

    pub fn with_oembed_url(mut self, url: impl Into<String>) -> Self {
        self.oembed_url = url.into();
        self
    }

    pub fn with_noembed_url(mut self, url: impl Into<String>) -> Self {
        self.noembed_url = url.into();
        self
    }

    async fn fetch_author(&self, item_id: &str, endpoint: EmbedEndpoint) -> Result<Option<String>> {
        let endpoint_url = match endpoint {
            EmbedEndpoint::NoEmbed => &self.noembed_url,
            EmbedEndpoint::OEmbed => &self.oembed_url,
        };
        let watch_url = format!("{}{}", WATCH_URL_PREFIX, item_id);

        let response = self
            .client
            .get(endpoint_url)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?;

        // noembed answers 200 with {"error": ...} for unknown videos, which
        // simply has no author_name.
        let body: EmbedResponse = response.json().await?;
        Ok(body.author_name.filter(|name| !name.trim().is_empty()))
    }
}

impl ChannelNameLookup for EmbedClient {
    async fn channel_name(&self, item_id: &str, endpoint: EmbedEndpoint) -> Option<String> {
        match self.fetch_author(item_id, endpoint).await {
            Ok(name) => name,
            Err(e) => {
                debug!("{} lookup failed for {}: {}", endpoint.as_str(), item_id, e);
                None
            }
        }
    }
}
