use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{CrawlError, Result};
use crate::forest::ForestLog;
use crate::model::ItemId;
use crate::tree::TreeBuilder;
use relgraph_api::DiscoveryApi;
use relgraph_api::client::MAX_RESULTS_CEILING;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    pub width: usize,
    pub depth: usize,
    pub max_depth: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            width: 3,
            depth: 2,
            max_depth: 10_000,
        }
    }
}

impl CrawlOptions {
    /// Check the options for a forest crawl. A depth-0 tree's only leaf is
    /// its own root, so forests need `depth >= 1`.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.width > MAX_RESULTS_CEILING {
            return Err(CrawlError::InvalidOptions(format!(
                "width must be between 1 and {}, got {}",
                MAX_RESULTS_CEILING, self.width
            )));
        }
        if self.depth == 0 {
            return Err(CrawlError::InvalidOptions(
                "depth must be at least 1 for a forest crawl".to_string(),
            ));
        }
        if self.max_depth % self.depth != 0 {
            warn!(
                "max depth {} is not a multiple of depth {}; the crawl stops at depth {}",
                self.max_depth,
                self.depth,
                self.max_depth.div_ceil(self.depth) * self.depth
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Fresh,
    RootBuilt,
    Expanding,
    Paused,
    Exhausted,
    Completed,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlPhase::Fresh => "fresh",
            CrawlPhase::RootBuilt => "root built",
            CrawlPhase::Expanding => "expanding",
            CrawlPhase::Paused => "paused",
            CrawlPhase::Exhausted => "exhausted",
            CrawlPhase::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum CrawlEvent {
    Phase(CrawlPhase),
    TreeAppended {
        root: ItemId,
        checkpoint: Checkpoint,
        trees_built: usize,
    },
}

/// Progress callback type for crawl events
pub type CrawlProgressCallback = Arc<dyn Fn(&CrawlEvent) + Send + Sync>;

#[derive(Debug)]
pub enum CrawlOutcome {
    /// A build failed; the checkpoint points at the failing leaf.
    Paused {
        checkpoint: Checkpoint,
        error: CrawlError,
    },
    /// `max_depth` reached; the checkpoint points at the next unbuilt leaf.
    Exhausted { checkpoint: Checkpoint },
    /// No leaves left at any level.
    Completed { checkpoint: Checkpoint },
}

impl CrawlOutcome {
    pub fn checkpoint(&self) -> &Checkpoint {
        match self {
            CrawlOutcome::Paused { checkpoint, .. }
            | CrawlOutcome::Exhausted { checkpoint }
            | CrawlOutcome::Completed { checkpoint } => checkpoint,
        }
    }
}

#[derive(Debug)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    /// Trees appended during this run, the seed tree included.
    pub trees_built: usize,
}

/// Expands a seed into a forest of trees, one persisted tree per leaf of the
/// trees before it, checkpointing after every append.
///
/// One crawler owns its forest log and checkpoint file; two crawlers on the
/// same pair corrupt each other's state.
pub struct ForestCrawler<'a, A> {
    builder: TreeBuilder<'a, A>,
    forest: ForestLog,
    checkpoints: CheckpointStore,
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
}

impl<'a, A: DiscoveryApi> ForestCrawler<'a, A> {
    pub fn new(
        api: &'a A,
        forest: ForestLog,
        checkpoints: CheckpointStore,
        options: CrawlOptions,
    ) -> Self {
        Self {
            builder: TreeBuilder::new(api),
            forest,
            checkpoints,
            options,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn forest(&self) -> &ForestLog {
        &self.forest
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Crawl from `seed`, resuming from the saved checkpoint when one exists.
    ///
    /// Errors are returned only when nothing could be checkpointed (the seed
    /// tree itself failed) or when the log or checkpoint cannot be used.
    /// Every failure after the seed tree is persisted ends in
    /// [`CrawlOutcome::Paused`].
    pub async fn run(&self, seed: &str) -> Result<CrawlReport> {
        self.options.validate()?;

        let mut trees_built = 0;
        let state = if self.forest.exists() {
            match self.checkpoints.load()? {
                Some(checkpoint) => {
                    self.forest.repair_torn_tail()?;
                    let state = self.reconcile(checkpoint)?;
                    info!(
                        tree_index = state.tree_index,
                        leaf_index = state.leaf_index,
                        cumulative_depth = state.cumulative_depth,
                        "Resuming crawl of {}",
                        seed
                    );
                    state
                }
                None => {
                    let backup = self.forest.move_aside()?;
                    warn!(
                        "No checkpoint for existing forest; moved it to {} and starting over",
                        backup.display()
                    );
                    let state = self.start_fresh(seed).await?;
                    trees_built += 1;
                    state
                }
            }
        } else {
            // A checkpoint without its forest describes nothing.
            self.checkpoints.remove()?;
            let state = self.start_fresh(seed).await?;
            trees_built += 1;
            state
        };

        self.emit(&CrawlEvent::Phase(CrawlPhase::Expanding));
        let outcome = self.expand(state, &mut trees_built).await?;
        Ok(CrawlReport {
            outcome,
            trees_built,
        })
    }

    async fn start_fresh(&self, seed: &str) -> Result<Checkpoint> {
        self.emit(&CrawlEvent::Phase(CrawlPhase::Fresh));
        info!("Building seed tree for {}", seed);

        let tree = self
            .builder
            .build_tree(seed, self.options.width, self.options.depth)
            .await?;
        self.forest.create(&tree)?;

        let state = Checkpoint::after_root(self.options.depth);
        self.checkpoints.save(&state)?;
        self.emit(&CrawlEvent::Phase(CrawlPhase::RootBuilt));
        Ok(state)
    }

    async fn expand(&self, mut state: Checkpoint, trees_built: &mut usize) -> Result<CrawlOutcome> {
        let CrawlOptions {
            width,
            depth,
            max_depth,
        } = self.options;

        loop {
            if state.current_leafs == 0 {
                if state.next_leafs == 0 {
                    self.checkpoints.save(&state)?;
                    info!(trees_built = *trees_built, "Forest fully expanded");
                    self.emit(&CrawlEvent::Phase(CrawlPhase::Completed));
                    return Ok(CrawlOutcome::Completed { checkpoint: state });
                }
                state.cumulative_depth += depth;
                state.current_leafs = state.next_leafs;
                state.next_leafs = 0;
                debug!(
                    cumulative_depth = state.cumulative_depth,
                    current_leafs = state.current_leafs,
                    "Advanced to next forest level"
                );
            }

            if state.cumulative_depth >= max_depth {
                self.checkpoints.save(&state)?;
                info!(
                    tree_index = state.tree_index,
                    leaf_index = state.leaf_index,
                    cumulative_depth = state.cumulative_depth,
                    "Max depth {} reached",
                    max_depth
                );
                self.emit(&CrawlEvent::Phase(CrawlPhase::Exhausted));
                return Ok(CrawlOutcome::Exhausted { checkpoint: state });
            }

            let Some(tree) = self.forest.read_tree(state.tree_index)? else {
                // The counters promise more trees than the log holds.
                return Err(CrawlError::Corrupt {
                    path: self.forest.path().to_path_buf(),
                    line: state.tree_index + 1,
                    reason: "checkpoint refers to a tree past the end of the log".to_string(),
                });
            };
            let leaves = tree.leaves();

            while state.leaf_index < leaves.len() {
                let leaf = &leaves[state.leaf_index];
                match self.builder.build_tree(leaf, width, depth).await {
                    Ok(subtree) => {
                        self.forest.append(&subtree)?;
                        *trees_built += 1;
                        state.leaf_index += 1;
                        self.checkpoints.save(&state)?;
                        debug!(
                            tree_index = state.tree_index,
                            leaf_index = state.leaf_index,
                            item = leaf.as_str(),
                            "Appended tree"
                        );
                        self.emit(&CrawlEvent::TreeAppended {
                            root: leaf.clone(),
                            checkpoint: state,
                            trees_built: *trees_built,
                        });
                    }
                    Err(error) => {
                        self.checkpoints.save(&state)?;
                        warn!(
                            tree_index = state.tree_index,
                            leaf_index = state.leaf_index,
                            item = leaf.as_str(),
                            quota = error.is_quota(),
                            "Crawl paused: {}",
                            error
                        );
                        self.emit(&CrawlEvent::Phase(CrawlPhase::Paused));
                        return Ok(CrawlOutcome::Paused {
                            checkpoint: state,
                            error,
                        });
                    }
                }
            }

            state.next_leafs += leaves.len();
            state.current_leafs -= 1;
            state.tree_index += 1;
            state.leaf_index = 0;
        }
    }

    /// Line the checkpoint up with the log. A process killed between an
    /// append and the following save leaves trees the checkpoint does not
    /// count; skip past them instead of building them again.
    fn reconcile(&self, mut state: Checkpoint) -> Result<Checkpoint> {
        let mut accounted = 1;
        let mut current_leaves = None;
        let mut total = 0;

        for (index, tree) in self.forest.iter()?.enumerate() {
            let tree = tree?;
            if index < state.tree_index {
                accounted += tree.leaves().len();
            } else if index == state.tree_index {
                current_leaves = Some(tree.leaves().len());
            }
            total += 1;
        }
        accounted += state.leaf_index;

        if total < accounted {
            return Err(CrawlError::Corrupt {
                path: self.forest.path().to_path_buf(),
                line: total,
                reason: format!(
                    "checkpoint accounts for {} trees but the log holds {}",
                    accounted, total
                ),
            });
        }

        let excess = total - accounted;
        if excess > 0 {
            let available = current_leaves.unwrap_or(0).saturating_sub(state.leaf_index);
            if excess > available {
                warn!(
                    "Log holds {} trees beyond the checkpoint but only {} leaves remain in tree {}",
                    excess, available, state.tree_index
                );
            }
            let skip = excess.min(available);
            info!(
                "Skipping {} tree(s) appended after the last checkpoint",
                skip
            );
            state.leaf_index += skip;
            self.checkpoints.save(&state)?;
        }
        Ok(state)
    }

    fn emit(&self, event: &CrawlEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }
}
