use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type ItemId = String;
pub type ChannelId = String;

/// One discovered item and the edge that discovered it. `parent` is `None`
/// only for a tree root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub item: ItemId,
    pub parent: Option<ItemId>,
    pub title: String,
    pub channel: ChannelId,
}

impl RelationRecord {
    pub fn root(item: impl Into<ItemId>, title: impl Into<String>, channel: impl Into<ChannelId>) -> Self {
        Self {
            item: item.into(),
            parent: None,
            title: title.into(),
            channel: channel.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// All items discovered at one depth of one tree, keyed by item id and kept
/// in discovery order. Inserting an id that is already present replaces its
/// record but keeps its position (last writer wins).
///
/// Serialized as a JSON array of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RelationRecord>", into = "Vec<RelationRecord>")]
pub struct Layer {
    records: IndexMap<ItemId, RelationRecord>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: RelationRecord) {
        self.records.insert(record.item.clone(), record);
    }

    /// Fold `other` into this layer, later records replacing earlier ones.
    pub fn merge(&mut self, other: Layer) {
        for (_, record) in other.records {
            self.insert(record);
        }
    }

    pub fn get(&self, item: &str) -> Option<&RelationRecord> {
        self.records.get(item)
    }

    pub fn contains(&self, item: &str) -> bool {
        self.records.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.records.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &RelationRecord> {
        self.records.values()
    }
}

impl From<Vec<RelationRecord>> for Layer {
    fn from(records: Vec<RelationRecord>) -> Self {
        let mut layer = Layer::new();
        for record in records {
            layer.insert(record);
        }
        layer
    }
}

impl From<Layer> for Vec<RelationRecord> {
    fn from(layer: Layer) -> Self {
        layer.records.into_values().collect()
    }
}

impl FromIterator<RelationRecord> for Layer {
    fn from_iter<I: IntoIterator<Item = RelationRecord>>(iter: I) -> Self {
        let mut layer = Layer::new();
        for record in iter {
            layer.insert(record);
        }
        layer
    }
}

/// One bounded BFS expansion. `layers[0]` holds exactly the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    layers: Vec<Layer>,
}

impl Tree {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of layers, i.e. the build depth plus one.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn root(&self) -> Option<&RelationRecord> {
        self.layers.first().and_then(|layer| layer.records().next())
    }

    /// The deepest layer's item ids, in discovery order. For a depth-0 tree
    /// this is the root itself.
    pub fn leaves(&self) -> Vec<ItemId> {
        self.layers
            .last()
            .map(|layer| layer.item_ids().cloned().collect())
            .unwrap_or_default()
    }

    /// Every record of every layer, root first.
    pub fn records(&self) -> impl Iterator<Item = &RelationRecord> {
        self.layers.iter().flat_map(|layer| layer.records())
    }

    /// Parent→child edges, one per distinct item, taking the first layer an
    /// item appears in. Items that reappear deeper (or equal the root) add no
    /// second edge.
    pub fn edges(&self) -> Vec<(ItemId, ItemId)> {
        let mut seen: indexmap::IndexSet<&str> = indexmap::IndexSet::new();
        if let Some(root) = self.root() {
            seen.insert(root.item.as_str());
        }

        let mut edges = Vec::new();
        for layer in self.layers.iter().skip(1) {
            for record in layer.records() {
                let Some(parent) = record.parent.as_deref() else {
                    continue;
                };
                if seen.insert(record.item.as_str()) {
                    edges.push((parent.to_string(), record.item.clone()));
                }
            }
        }
        edges
    }

    /// Distinct items of the tree, root first, in first-occurrence order.
    pub fn nodes(&self) -> Vec<ItemId> {
        let mut nodes: Vec<ItemId> = self.root().map(|r| r.item.clone()).into_iter().collect();
        nodes.extend(self.edges().into_iter().map(|(_, child)| child));
        nodes
    }

    /// Item → channel id across all layers.
    pub fn channel_of(&self, item: &str) -> Option<&ChannelId> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(item))
            .map(|record| &record.channel)
    }
}
