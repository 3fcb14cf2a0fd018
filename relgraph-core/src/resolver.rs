//! Identity resolution: authoritative root lookup and best-effort channel
//! naming.

use crate::error::{CrawlError, Result};
use regex::Regex;
use relgraph_api::{ApiError, ChannelNameLookup, DiscoveryApi, EmbedEndpoint, VideoInfo};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Placeholder channel name for items whose channel could not be named.
pub const NOT_FOUND: &str = "Not Found";

/// How many resolutions (or trees, for the aggregator) between endpoint swaps.
pub const ROTATION_PERIOD: usize = 20;

static NON_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelName {
    Resolved(String),
    NotFound,
}

impl ChannelName {
    pub fn as_str(&self) -> &str {
        match self {
            ChannelName::Resolved(name) => name,
            ChannelName::NotFound => NOT_FOUND,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ChannelName::Resolved(_))
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip everything but word characters, whitespace and dashes, then trim.
/// A name that cleans down to nothing counts as unresolved.
pub fn clean_channel_name(raw: &str) -> ChannelName {
    let cleaned = NON_NAME_CHARS.replace_all(raw, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        ChannelName::NotFound
    } else {
        ChannelName::Resolved(cleaned.to_string())
    }
}

/// Resolves a tree root through the quota-bearing API.
pub struct RootResolver<'a, A> {
    api: &'a A,
}

impl<'a, A: DiscoveryApi> RootResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Title and channel id of `item`. A missing item is an
    /// [`CrawlError::AuthoritativeLookup`]; quota and transport failures keep
    /// their own classification so the crawler can checkpoint on them.
    pub async fn resolve_root(&self, item: &str) -> Result<VideoInfo> {
        match self.api.video_info(item).await {
            Ok(info) => Ok(info),
            Err(ApiError::NotFound(_)) => Err(CrawlError::AuthoritativeLookup {
                item: item.to_string(),
                reason: "item not found".to_string(),
            }),
            Err(ApiError::Parse(reason)) => Err(CrawlError::AuthoritativeLookup {
                item: item.to_string(),
                reason,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Names channels through the quota-free embed endpoints.
pub struct ChannelResolver<'a, L> {
    lookup: &'a L,
}

impl<'a, L: ChannelNameLookup> ChannelResolver<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub async fn resolve_channel_name(&self, item: &str, endpoint: EmbedEndpoint) -> ChannelName {
        match self.lookup.channel_name(item, endpoint).await {
            Some(raw) => clean_channel_name(&raw),
            None => {
                debug!("No channel name for {} via {}", item, endpoint.as_str());
                ChannelName::NotFound
            }
        }
    }
}

/// Alternates the embed endpoint every `period` ticks, starting on noembed.
#[derive(Debug, Clone)]
pub struct EndpointRotation {
    period: usize,
    ticks: usize,
    current: EmbedEndpoint,
}

impl EndpointRotation {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            ticks: 0,
            current: EmbedEndpoint::NoEmbed,
        }
    }

    /// Endpoint for the next unit of work. Flips before every tick that is a
    /// positive multiple of the period.
    pub fn next(&mut self) -> EmbedEndpoint {
        if self.ticks > 0 && self.ticks % self.period == 0 {
            self.current = self.current.toggled();
        }
        self.ticks += 1;
        self.current
    }
}

impl Default for EndpointRotation {
    fn default() -> Self {
        Self::new(ROTATION_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_channel_name_strips_punctuation() {
        assert_eq!(
            clean_channel_name("  Foo & Bar's Channel! "),
            ChannelName::Resolved("Foo  Bars Channel".to_string())
        );
        assert_eq!(clean_channel_name("!!!"), ChannelName::NotFound);
        assert_eq!(
            clean_channel_name("Café-Ünïcode_1"),
            ChannelName::Resolved("Café-Ünïcode_1".to_string())
        );
    }

    #[test]
    fn test_rotation_flips_every_period() {
        let mut rotation = EndpointRotation::new(20);
        let endpoints: Vec<_> = (0..45).map(|_| rotation.next()).collect();

        assert!(endpoints[..20].iter().all(|e| *e == EmbedEndpoint::NoEmbed));
        assert!(endpoints[20..40].iter().all(|e| *e == EmbedEndpoint::OEmbed));
        assert!(endpoints[40..].iter().all(|e| *e == EmbedEndpoint::NoEmbed));
    }

    #[test]
    fn test_not_found_displays_placeholder() {
        assert_eq!(ChannelName::NotFound.to_string(), "Not Found");
        assert!(!ChannelName::NotFound.is_resolved());
    }
}
