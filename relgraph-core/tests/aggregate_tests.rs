// Tests for channel aggregation and graph export

mod common;

use common::{FakeLookup, tree};
use relgraph_api::EmbedEndpoint;
use relgraph_core::aggregate::{ChannelAggregator, aggregate, aggregate_forest};
use relgraph_core::export::{ExportFormat, export_graph, sanitize_file_stem};
use relgraph_core::forest::ForestLog;
use relgraph_core::{ChannelName, NOT_FOUND, Tree};
use tempfile::TempDir;

fn assert_size(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("node present");
    assert!((actual - expected).abs() < 1e-9, "size {} != {}", actual, expected);
}

// ============================================================================
// Edge weights
// ============================================================================

#[tokio::test]
async fn test_single_edge_between_distinct_channels() {
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v1", "Beta")]);
    let t = tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC1")]]);

    let result = aggregate(&[t.clone()], &lookup).await;
    assert_eq!(result.graph.edge_count(), 1);
    assert_eq!(result.graph.weight("Alpha", "Beta"), Some(1));

    let twice = aggregate(&[t.clone(), t], &lookup).await;
    assert_eq!(twice.graph.edge_count(), 1);
    assert_eq!(twice.graph.weight("Alpha", "Beta"), Some(2));
    assert_eq!(twice.stats.edge_events, 2);
}

#[tokio::test]
async fn test_self_relation_adds_nothing() {
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v1", "Alpha")]);
    let t = tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC0")]]);

    let result = aggregate(&[t], &lookup).await;
    assert_eq!(result.graph.edge_count(), 0);
    assert_eq!(result.stats.edge_events, 0);
}

#[tokio::test]
async fn test_edges_follow_first_occurrence() {
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v1", "Beta"), ("v2", "Gamma")]);
    // v0 shows up again below v1 and must not add a Beta-Alpha edge.
    let t = tree(&[
        &[("v0", None, "UC0")],
        &[("v1", Some("v0"), "UC1")],
        &[("v0", Some("v1"), "UC0"), ("v2", Some("v1"), "UC2")],
    ]);

    let result = aggregate(&[t], &lookup).await;
    assert_eq!(result.graph.weight("Alpha", "Beta"), Some(1));
    assert_eq!(result.graph.weight("Beta", "Gamma"), Some(1));
    assert_eq!(result.graph.edge_count(), 2);
}

// ============================================================================
// Unresolved channels
// ============================================================================

#[tokio::test]
async fn test_half_resolved_edge_adds_isolated_node() {
    let lookup = FakeLookup::new(&[("v1", "Alpha")]);
    let t = tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC1")]]);

    let result = aggregate(&[t], &lookup).await;
    assert_eq!(result.graph.edge_count(), 0);
    assert!(!result.graph.contains(NOT_FOUND));
    assert_size(result.graph.size_of("Alpha"), 1.1);
}

#[tokio::test]
async fn test_half_resolved_edge_links_known_channel_to_not_found() {
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v1", "Beta")]);
    let first = tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC1")]]);
    let second = tree(&[&[("v1", None, "UC1")], &[("v9", Some("v1"), "UC9")]]);

    let result = aggregate(&[first, second], &lookup).await;
    assert_eq!(result.graph.weight("Beta", NOT_FOUND), Some(1));
    assert_size(result.graph.size_of(NOT_FOUND), 1.0);
}

#[tokio::test]
async fn test_unresolved_pair_adds_nothing() {
    let lookup = FakeLookup::new(&[]);
    let t = tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC1")]]);

    let result = aggregate(&[t], &lookup).await;
    assert_eq!(result.graph.node_count(), 0);
    assert_eq!(result.root_channel, Some(ChannelName::NotFound));
}

#[tokio::test]
async fn test_channel_map_prefers_resolved_name() {
    // v1 and v2 share a channel; only v2 can be named.
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v2", "Beta")]);
    let t = tree(&[
        &[("v0", None, "UC0")],
        &[("v1", Some("v0"), "UC1"), ("v2", Some("v0"), "UC1")],
    ]);

    let result = aggregate(&[t], &lookup).await;
    assert_eq!(result.graph.weight("Alpha", "Beta"), Some(2));
    assert!(!result.graph.contains(NOT_FOUND));
}

// ============================================================================
// Sizes
// ============================================================================

#[tokio::test]
async fn test_roots_never_add_size() {
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v1", "Beta"), ("v2", "Gamma")]);
    let first = tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC1")]]);
    let second = tree(&[&[("v1", None, "UC1")], &[("v2", Some("v1"), "UC2")]]);

    let result = aggregate(&[first, second], &lookup).await;
    assert_size(result.graph.size_of("Alpha"), 1.0);
    assert_size(result.graph.size_of("Beta"), 1.1);
    assert_size(result.graph.size_of("Gamma"), 1.1);
    assert_eq!(result.stats.node_visits, 2);
    assert_eq!(result.stats.trees, 2);
}

#[tokio::test]
async fn test_repeated_channel_accumulates_size() {
    let lookup = FakeLookup::new(&[("v0", "Alpha"), ("v1", "Beta"), ("v2", "Beta"), ("v3", "Beta")]);
    let t = tree(&[
        &[("v0", None, "UC0")],
        &[("v1", Some("v0"), "UC1"), ("v2", Some("v0"), "UC1"), ("v3", Some("v0"), "UC1")],
    ]);

    let result = aggregate(&[t], &lookup).await;
    assert_size(result.graph.size_of("Beta"), 1.3);
    assert_eq!(result.graph.weight("Alpha", "Beta"), Some(3));
}

// ============================================================================
// Endpoint rotation
// ============================================================================

#[tokio::test]
async fn test_endpoint_rotates_every_twenty_trees() {
    let lookup = FakeLookup::new(&[]);
    let single = tree(&[&[("v0", None, "UC0")]]);

    let mut aggregator = ChannelAggregator::new(&lookup);
    for _ in 0..41 {
        aggregator.add_tree(&single).await;
    }

    let endpoints = lookup.endpoints();
    assert_eq!(endpoints.len(), 41);
    assert!(endpoints[..20].iter().all(|e| *e == EmbedEndpoint::NoEmbed));
    assert!(endpoints[20..40].iter().all(|e| *e == EmbedEndpoint::OEmbed));
    assert_eq!(endpoints[40], EmbedEndpoint::NoEmbed);
}

#[tokio::test]
async fn test_one_endpoint_per_tree() {
    let lookup = FakeLookup::new(&[]);
    let big = tree(&[
        &[("v0", None, "UC0")],
        &[("v1", Some("v0"), "UC1"), ("v2", Some("v0"), "UC2")],
    ]);

    aggregate(&[big], &lookup).await;
    assert_eq!(lookup.endpoints(), vec![EmbedEndpoint::NoEmbed; 3]);
}

#[tokio::test]
async fn test_empty_tree_does_not_advance_rotation() {
    let lookup = FakeLookup::new(&[]);
    let single = tree(&[&[("v0", None, "UC0")]]);
    let empty = Tree::new(Vec::new());

    let mut aggregator = ChannelAggregator::new(&lookup);
    aggregator.add_tree(&empty).await;
    for _ in 0..20 {
        aggregator.add_tree(&single).await;
    }
    aggregator.add_tree(&empty).await;
    aggregator.add_tree(&single).await;

    let endpoints = lookup.endpoints();
    assert_eq!(endpoints.len(), 21);
    assert!(endpoints[..20].iter().all(|e| *e == EmbedEndpoint::NoEmbed));
    assert_eq!(endpoints[20], EmbedEndpoint::OEmbed);
    assert_eq!(aggregator.stats().trees, 21);
}

// ============================================================================
// Forest logs and export
// ============================================================================

#[tokio::test]
async fn test_aggregate_forest_and_export_named_after_root_channel() {
    let dir = TempDir::new().unwrap();
    let forest = ForestLog::new(dir.path().join("data").join("v0.log"));
    forest
        .create(&tree(&[&[("v0", None, "UC0")], &[("v1", Some("v0"), "UC1")]]))
        .unwrap();
    forest
        .append(&tree(&[&[("v1", None, "UC1")], &[("v2", Some("v1"), "UC2")]]))
        .unwrap();

    let lookup = FakeLookup::new(&[("v0", "Foo Bar! Baz"), ("v1", "Beta"), ("v2", "Gamma")]);
    let result = aggregate_forest(&forest, &lookup).await.unwrap();
    assert_eq!(result.stats.trees, 2);
    assert_eq!(result.graph.edge_count(), 2);

    let root = result.root_channel.expect("root channel");
    let stem = sanitize_file_stem(root.as_str());
    assert_eq!(stem, "Foo_Bar_Baz");

    let path = export_graph(&result.graph, ExportFormat::GraphMl, &dir.path().join("graphs"), &stem).unwrap();
    assert!(path.ends_with("graphs/Foo_Bar_Baz.graphml"));
    let xml = std::fs::read_to_string(path).unwrap();
    assert!(xml.contains("<node id=\"Foo Bar Baz\">"));
    assert!(xml.contains("source=\"Beta\" target=\"Gamma\""));
}
