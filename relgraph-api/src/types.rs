use serde::{Deserialize, Serialize};

/// Authoritative metadata for one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub channel_id: String,
}

/// One entry of a related-video search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedItem {
    pub item_id: String,
    pub title: String,
    pub channel_id: String,
}

/// The two quota-free endpoints that can name a video's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbedEndpoint {
    NoEmbed,
    OEmbed,
}

impl EmbedEndpoint {
    pub fn toggled(self) -> Self {
        match self {
            EmbedEndpoint::NoEmbed => EmbedEndpoint::OEmbed,
            EmbedEndpoint::OEmbed => EmbedEndpoint::NoEmbed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedEndpoint::NoEmbed => "noembed",
            EmbedEndpoint::OEmbed => "oembed",
        }
    }
}

// Wire envelopes. Only the fields we read are modelled.

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Snippet {
    pub title: String,
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideoResource {
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResultId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    pub id: SearchResultId,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedResponse {
    pub author_name: Option<String>,
}
