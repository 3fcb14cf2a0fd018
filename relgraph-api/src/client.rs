use crate::error::{ApiError, QUOTA_REASONS, Result};
use crate::types::{
    ErrorEnvelope, ListResponse, RelatedItem, SearchResult, VideoInfo, VideoResource,
};
use crate::DiscoveryApi;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Header carrying the key. Kept out of the query string so request URLs
/// never contain it.
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// The largest `maxResults` the search endpoint accepts.
pub const MAX_RESULTS_CEILING: usize = 50;

/// Client for the authoritative discovery API. Every call costs quota on
/// the key it was built with.
pub struct DiscoveryClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DiscoveryClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("relgraph/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs / 2))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .query(query)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Turn a non-success response into the matching [`ApiError`]. Quota
/// exhaustion is recognised by the reason codes in the error envelope, not by
/// the status code alone, since the platform reports it as a plain 403.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok();

    if let Some(envelope) = envelope {
        if let Some(detail) = envelope
            .error
            .errors
            .iter()
            .find(|d| QUOTA_REASONS.contains(&d.reason.as_str()))
        {
            warn!("Quota exhausted: {}", detail.reason);
            return Err(ApiError::QuotaExceeded {
                reason: detail.reason.clone(),
                message: envelope.error.message,
            });
        }
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: envelope.error.message,
        });
    }

    Err(ApiError::Api {
        status: status.as_u16(),
        message: body,
    })
}

impl DiscoveryApi for DiscoveryClient {
    async fn video_info(&self, item_id: &str) -> Result<VideoInfo> {
        let response: ListResponse<VideoResource> = self
            .get_json("videos", &[("part", "snippet"), ("id", item_id)])
            .await?;

        let video = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(item_id.to_string()))?;

        Ok(VideoInfo {
            title: video.snippet.title,
            channel_id: video.snippet.channel_id,
        })
    }

    async fn related(&self, item_id: &str, width: usize) -> Result<Vec<RelatedItem>> {
        let max_results = width.min(MAX_RESULTS_CEILING).to_string();
        let response: ListResponse<SearchResult> = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("relatedToVideoId", item_id),
                    ("maxResults", max_results.as_str()),
                    ("type", "video"),
                ],
            )
            .await?;

        // Channel and playlist hits carry no videoId; they cannot be expanded.
        let items = response
            .items
            .into_iter()
            .filter_map(|result| {
                result.id.video_id.map(|video_id| RelatedItem {
                    item_id: video_id,
                    title: result.snippet.title,
                    channel_id: result.snippet.channel_id,
                })
            })
            .take(width)
            .collect();

        Ok(items)
    }
}
