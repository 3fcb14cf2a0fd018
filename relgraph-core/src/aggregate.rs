//! Folds trees into one weighted, undirected channel-level graph.

use crate::error::Result;
use crate::forest::ForestLog;
use crate::model::{ChannelId, ItemId, Tree};
use crate::resolver::{ChannelName, ChannelResolver, EndpointRotation, NOT_FOUND};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use relgraph_api::ChannelNameLookup;
use std::collections::HashMap;
use tracing::{debug, info};

/// Size added to a channel each time one of its items shows up below a root.
pub const SIZE_INCREMENT: f64 = 0.1;

/// Size a channel starts at when it first enters the graph.
pub const INITIAL_SIZE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelNode {
    pub name: String,
    pub size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelEdge {
    pub weight: u64,
}

/// Channel names as nodes, co-occurrence counts as edge weights. Node names
/// are unique; the `"Not Found"` placeholder is an ordinary node.
#[derive(Debug, Clone, Default)]
pub struct ChannelGraph {
    graph: UnGraph<ChannelNode, ChannelEdge>,
    index: HashMap<String, NodeIndex>,
}

impl ChannelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, adding it at [`INITIAL_SIZE`] if it is new. An
    /// existing node keeps its size.
    pub fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(ChannelNode {
            name: name.to_string(),
            size: INITIAL_SIZE,
        });
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn add_size(&mut self, name: &str, delta: f64) {
        let idx = self.ensure_node(name);
        self.graph[idx].size += delta;
    }

    /// Count one relation between two distinct channels: a new edge starts at
    /// weight 1, an existing one is incremented. Returns the new weight, or
    /// `None` for a self-relation.
    pub fn add_relation(&mut self, a: &str, b: &str) -> Option<u64> {
        if a == b {
            return None;
        }
        let a = self.ensure_node(a);
        let b = self.ensure_node(b);
        match self.graph.find_edge(a, b) {
            Some(edge) => {
                self.graph[edge].weight += 1;
                Some(self.graph[edge].weight)
            }
            None => {
                self.graph.add_edge(a, b, ChannelEdge { weight: 1 });
                Some(1)
            }
        }
    }

    pub fn size_of(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&idx| self.graph[idx].size)
    }

    pub fn weight(&self, a: &str, b: &str) -> Option<u64> {
        let a = *self.index.get(a)?;
        let b = *self.index.get(b)?;
        self.graph.find_edge(a, b).map(|edge| self.graph[edge].weight)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ChannelNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order as `(source, target, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].name.as_str(),
                self.graph[edge.target()].name.as_str(),
                edge.weight().weight,
            )
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub trees: usize,
    /// Resolved non-root items counted towards channel sizes.
    pub node_visits: usize,
    /// Edges created or incremented.
    pub edge_events: usize,
}

#[derive(Debug)]
pub struct Aggregation {
    pub graph: ChannelGraph,
    pub stats: AggregateStats,
    /// Channel of the first tree's root; `None` when no tree was added.
    pub root_channel: Option<ChannelName>,
}

/// Builds a [`ChannelGraph`] tree by tree. Order matters: endpoint rotation
/// follows the tree count, and whether a half-resolved edge becomes an edge
/// depends on what earlier trees already added.
pub struct ChannelAggregator<'a, L> {
    resolver: ChannelResolver<'a, L>,
    rotation: EndpointRotation,
    graph: ChannelGraph,
    stats: AggregateStats,
    root_channel: Option<ChannelName>,
}

impl<'a, L: ChannelNameLookup> ChannelAggregator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self::with_rotation(lookup, EndpointRotation::default())
    }

    pub fn with_rotation(lookup: &'a L, rotation: EndpointRotation) -> Self {
        Self {
            resolver: ChannelResolver::new(lookup),
            rotation,
            graph: ChannelGraph::new(),
            stats: AggregateStats::default(),
            root_channel: None,
        }
    }

    pub async fn add_tree(&mut self, tree: &Tree) {
        let nodes = tree.nodes();
        let Some(root) = nodes.first() else {
            return;
        };
        let endpoint = self.rotation.next();
        debug!(
            "Aggregating tree {} rooted at {} via {}",
            self.stats.trees,
            root,
            endpoint.as_str()
        );

        let mut item_names: HashMap<&str, ChannelName> = HashMap::with_capacity(nodes.len());
        let mut channel_names: HashMap<&ChannelId, ChannelName> = HashMap::new();
        for item in &nodes {
            let name = self.resolver.resolve_channel_name(item, endpoint).await;
            if let Some(channel) = tree.channel_of(item) {
                let keep_existing = channel_names
                    .get(channel)
                    .is_some_and(|existing| existing.is_resolved() || !name.is_resolved());
                if !keep_existing {
                    channel_names.insert(channel, name.clone());
                }
            }
            item_names.insert(item.as_str(), name);
        }

        let name_of = |item: &ItemId| -> ChannelName {
            tree.channel_of(item)
                .and_then(|channel| channel_names.get(channel))
                .or_else(|| item_names.get(item.as_str()))
                .cloned()
                .unwrap_or(ChannelName::NotFound)
        };

        if self.root_channel.is_none() {
            self.root_channel = Some(name_of(root));
        }

        for (parent, child) in tree.edges() {
            let (a, b) = (name_of(&parent), name_of(&child));
            let counted = match (a.is_resolved(), b.is_resolved()) {
                (false, false) => None,
                (true, false) | (false, true) => {
                    let resolved = if a.is_resolved() { &a } else { &b };
                    if self.graph.contains(resolved.as_str()) {
                        self.graph.add_relation(resolved.as_str(), NOT_FOUND)
                    } else {
                        self.graph.ensure_node(resolved.as_str());
                        None
                    }
                }
                (true, true) => self.graph.add_relation(a.as_str(), b.as_str()),
            };
            if counted.is_some() {
                self.stats.edge_events += 1;
            }
        }

        for item in nodes.iter().skip(1) {
            let name = name_of(item);
            if name.is_resolved() {
                self.graph.add_size(name.as_str(), SIZE_INCREMENT);
                self.stats.node_visits += 1;
            }
        }

        self.stats.trees += 1;
    }

    pub fn graph(&self) -> &ChannelGraph {
        &self.graph
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    pub fn finish(self) -> Aggregation {
        info!(
            trees = self.stats.trees,
            node_visits = self.stats.node_visits,
            edge_events = self.stats.edge_events,
            "Aggregated {} channels and {} relations",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        Aggregation {
            graph: self.graph,
            stats: self.stats,
            root_channel: self.root_channel,
        }
    }
}

/// Aggregate `trees` in order.
pub async fn aggregate<L: ChannelNameLookup>(trees: &[Tree], lookup: &L) -> Aggregation {
    let mut aggregator = ChannelAggregator::new(lookup);
    for tree in trees {
        aggregator.add_tree(tree).await;
    }
    aggregator.finish()
}

/// Aggregate a forest log, streaming one tree at a time.
pub async fn aggregate_forest<L: ChannelNameLookup>(
    forest: &ForestLog,
    lookup: &L,
) -> Result<Aggregation> {
    let mut aggregator = ChannelAggregator::new(lookup);
    for tree in forest.iter()? {
        aggregator.add_tree(&tree?).await;
    }
    Ok(aggregator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_relation_counts_distinct_pairs_once() {
        let mut graph = ChannelGraph::new();
        assert_eq!(graph.add_relation("A", "B"), Some(1));
        assert_eq!(graph.add_relation("B", "A"), Some(2));
        assert_eq!(graph.add_relation("A", "A"), None);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.weight("A", "B"), Some(2));
        assert_eq!(graph.weight("A", "A"), None);
    }

    #[test]
    fn test_ensure_node_never_resets_size() {
        let mut graph = ChannelGraph::new();
        graph.add_size("A", 0.5);
        graph.ensure_node("A");
        graph.add_relation("A", "B");

        assert_eq!(graph.size_of("A"), Some(1.5));
        assert_eq!(graph.size_of("B"), Some(INITIAL_SIZE));
        assert_eq!(graph.node_count(), 2);
    }
}
