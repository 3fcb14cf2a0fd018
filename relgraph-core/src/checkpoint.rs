//! Resumption state for a forest crawl and its on-disk form.

use crate::error::{CrawlError, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Exactly where a forest crawl stands: which leaf of which persisted tree is
/// expanded next, and the level bookkeeping for the overall forest depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    pub tree_index: usize,
    pub leaf_index: usize,
    /// Trees left to expand at the current forest level, including the one at
    /// `tree_index`.
    pub current_leafs: usize,
    /// Leaves discovered so far for the next level. Excludes the tree at
    /// `tree_index` until it has been fully expanded.
    pub next_leafs: usize,
    pub cumulative_depth: usize,
}

impl Checkpoint {
    /// State right after the seed tree of depth `depth` has been written.
    pub fn after_root(depth: usize) -> Self {
        Self {
            tree_index: 0,
            leaf_index: 0,
            current_leafs: 1,
            next_leafs: 0,
            cumulative_depth: depth,
        }
    }

    /// Nothing left to expand at this level or the next.
    pub fn is_finished(&self) -> bool {
        self.current_leafs == 0 && self.next_leafs == 0
    }

    fn fields(&self) -> [usize; 5] {
        [
            self.tree_index,
            self.leaf_index,
            self.current_leafs,
            self.next_leafs,
            self.cumulative_depth,
        ]
    }
}

impl fmt::Display for Checkpoint {
    /// Five newline-separated integers, in field order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self.fields() {
            writeln!(f, "{}", value)?;
        }
        Ok(())
    }
}

impl FromStr for Checkpoint {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let values = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.parse::<usize>()
                    .map_err(|e| format!("invalid field '{}': {}", line, e))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match values.as_slice() {
            &[tree_index, leaf_index, current_leafs, next_leafs, cumulative_depth] => Ok(Self {
                tree_index,
                leaf_index,
                current_leafs,
                next_leafs,
                cumulative_depth,
            }),
            other => Err(format!("expected 5 fields, found {}", other.len())),
        }
    }
}

/// The checkpoint file of one crawl target.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// The saved checkpoint, or `None` if there is none. A file that cannot
    /// be parsed counts as missing.
    pub fn load(&self) -> Result<Option<Checkpoint>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CrawlError::io(&self.path, e)),
        };

        match contents.parse::<Checkpoint>() {
            Ok(checkpoint) => {
                debug!("Loaded checkpoint {:?} from {}", checkpoint, self.path.display());
                Ok(Some(checkpoint))
            }
            Err(reason) => {
                warn!(
                    "Ignoring unreadable checkpoint {}: {}",
                    self.path.display(),
                    reason
                );
                Ok(None)
            }
        }
    }

    /// Overwrite the checkpoint. Written to a sibling temp file first and
    /// renamed into place, so readers never see a half-written file.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrawlError::io(parent, e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, checkpoint.to_string()).map_err(|e| CrawlError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CrawlError::io(&self.path, e))?;
        debug!(
            tree_index = checkpoint.tree_index,
            leaf_index = checkpoint.leaf_index,
            "Checkpoint saved"
        );
        Ok(())
    }

    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CrawlError::io(&self.path, e)),
        }
    }
}
