// In-memory stand-ins for the platform, shared by the integration tests.
#![allow(dead_code)]

use relgraph_api::{ApiError, ChannelNameLookup, DiscoveryApi, EmbedEndpoint, RelatedItem, VideoInfo};
use relgraph_core::model::{Layer, RelationRecord, Tree};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Deterministic discovery API. Unless scripted, item `x` has children
/// `x.0 .. x.<width-1>` and lives on channel `UC-x`.
#[derive(Default)]
pub struct FakeApi {
    related_calls: Mutex<Vec<String>>,
    fail_related_on: Option<usize>,
    fail_with_quota: bool,
    scripted: HashMap<String, Vec<RelatedItem>>,
    missing: HashSet<String>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th related call (1-based) with a quota error.
    pub fn failing_on_related_call(n: usize) -> Self {
        Self {
            fail_related_on: Some(n),
            fail_with_quota: true,
            ..Self::default()
        }
    }

    /// Fail the `n`-th related call with a non-quota API error.
    pub fn erroring_on_related_call(n: usize) -> Self {
        Self {
            fail_related_on: Some(n),
            fail_with_quota: false,
            ..Self::default()
        }
    }

    pub fn with_related(mut self, item: &str, children: &[&str]) -> Self {
        self.scripted.insert(
            item.to_string(),
            children
                .iter()
                .map(|child| RelatedItem {
                    item_id: child.to_string(),
                    title: format!("Title {}", child),
                    channel_id: channel_for(child),
                })
                .collect(),
        );
        self
    }

    pub fn with_missing(mut self, item: &str) -> Self {
        self.missing.insert(item.to_string());
        self
    }

    pub fn related_calls(&self) -> Vec<String> {
        self.related_calls.lock().unwrap().clone()
    }
}

pub fn channel_for(item: &str) -> String {
    format!("UC-{}", item)
}

impl DiscoveryApi for FakeApi {
    async fn video_info(&self, item_id: &str) -> Result<VideoInfo, ApiError> {
        if self.missing.contains(item_id) {
            return Err(ApiError::NotFound(item_id.to_string()));
        }
        Ok(VideoInfo {
            title: format!("Title {}", item_id),
            channel_id: channel_for(item_id),
        })
    }

    async fn related(&self, item_id: &str, width: usize) -> Result<Vec<RelatedItem>, ApiError> {
        let call = {
            let mut calls = self.related_calls.lock().unwrap();
            calls.push(item_id.to_string());
            calls.len()
        };

        if self.fail_related_on == Some(call) {
            return Err(if self.fail_with_quota {
                ApiError::QuotaExceeded {
                    reason: "quotaExceeded".to_string(),
                    message: "The request cannot be completed because you have exceeded your quota."
                        .to_string(),
                }
            } else {
                ApiError::Api {
                    status: 500,
                    message: "backend error".to_string(),
                }
            });
        }

        if let Some(children) = self.scripted.get(item_id) {
            return Ok(children.iter().take(width).cloned().collect());
        }

        Ok((0..width)
            .map(|i| {
                let child = format!("{}.{}", item_id, i);
                RelatedItem {
                    title: format!("Title {}", child),
                    channel_id: channel_for(&child),
                    item_id: child,
                }
            })
            .collect())
    }
}

/// Channel names from a fixed item → name table. Items absent from the
/// table cannot be named. Records which endpoint each lookup used.
#[derive(Default)]
pub struct FakeLookup {
    names: HashMap<String, String>,
    endpoints: Mutex<Vec<EmbedEndpoint>>,
}

impl FakeLookup {
    pub fn new(names: &[(&str, &str)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(item, name)| (item.to_string(), name.to_string()))
                .collect(),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn endpoints(&self) -> Vec<EmbedEndpoint> {
        self.endpoints.lock().unwrap().clone()
    }
}

impl ChannelNameLookup for FakeLookup {
    async fn channel_name(&self, item_id: &str, endpoint: EmbedEndpoint) -> Option<String> {
        self.endpoints.lock().unwrap().push(endpoint);
        self.names.get(item_id).cloned()
    }
}

/// A tree from `(item, parent, channel)` rows grouped by layer.
pub fn tree(layers: &[&[(&str, Option<&str>, &str)]]) -> Tree {
    Tree::new(
        layers
            .iter()
            .map(|rows| {
                rows.iter()
                    .map(|(item, parent, channel)| RelationRecord {
                        item: item.to_string(),
                        parent: parent.map(str::to_string),
                        title: format!("Title {}", item),
                        channel: channel.to_string(),
                    })
                    .collect::<Layer>()
            })
            .collect(),
    )
}
