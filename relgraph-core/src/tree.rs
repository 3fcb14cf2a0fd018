use crate::error::Result;
use crate::fetcher::RelationFetcher;
use crate::model::{Layer, RelationRecord, Tree};
use crate::resolver::RootResolver;
use relgraph_api::DiscoveryApi;
use tracing::debug;

/// Grows one bounded tree: `depth` layers below the root, each item expanded
/// to at most `width` related items.
///
/// A failure anywhere inside a build discards the partial tree; only whole
/// trees are ever persisted.
pub struct TreeBuilder<'a, A> {
    roots: RootResolver<'a, A>,
    fetcher: RelationFetcher<'a, A>,
}

impl<'a, A: DiscoveryApi> TreeBuilder<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            roots: RootResolver::new(api),
            fetcher: RelationFetcher::new(api),
        }
    }

    pub async fn build_tree(&self, root_item: &str, width: usize, depth: usize) -> Result<Tree> {
        let info = self.roots.resolve_root(root_item).await?;

        let mut layers = Vec::with_capacity(depth + 1);
        layers.push(Layer::from(vec![RelationRecord::root(
            root_item,
            info.title,
            info.channel_id,
        )]));

        for level in 1..=depth {
            let layer = if level == 1 {
                self.fetcher.related(root_item, width).await?
            } else {
                let mut layer = Layer::new();
                let parents: Vec<String> = layers[level - 1].item_ids().cloned().collect();
                for parent in parents {
                    // Later parents overwrite earlier ones on duplicate items.
                    layer.merge(self.fetcher.related(&parent, width).await?);
                }
                layer
            };
            debug!("Layer {} of {}: {} items", level, root_item, layer.len());
            layers.push(layer);
        }

        Ok(Tree::new(layers))
    }
}
