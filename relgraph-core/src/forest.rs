//! The forest log: one JSON-encoded tree per line, append-only.

use crate::error::{CrawlError, Result};
use crate::model::Tree;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Lines, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct ForestLog {
    path: PathBuf,
}

impl ForestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Start a new log holding only `root`, replacing any existing file.
    pub fn create(&self, root: &Tree) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrawlError::io(parent, e))?;
        }
        let mut file = File::create(&self.path).map_err(|e| CrawlError::io(&self.path, e))?;
        self.write_line(&mut file, root)?;
        info!("Created forest log: {}", self.path.display());
        Ok(())
    }

    /// Append one tree. The line is synced to disk before returning, so a
    /// checkpoint written afterwards never points past durable data.
    pub fn append(&self, tree: &Tree) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CrawlError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CrawlError::io(&self.path, e))?;
        self.write_line(&mut file, tree)
    }

    fn write_line(&self, file: &mut File, tree: &Tree) -> Result<()> {
        let mut line = serde_json::to_vec(tree).map_err(|e| CrawlError::Corrupt {
            path: self.path.clone(),
            line: 0,
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        file.write_all(&line)
            .and_then(|_| file.sync_data())
            .map_err(|e| CrawlError::io(&self.path, e))
    }

    pub fn iter(&self) -> Result<ForestIter> {
        let file = File::open(&self.path).map_err(|e| CrawlError::io(&self.path, e))?;
        Ok(ForestIter {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    /// Load every tree in log order.
    pub fn trees(&self) -> Result<Vec<Tree>> {
        self.iter()?.collect()
    }

    /// The tree at `index`, or `None` past the end of the log.
    pub fn read_tree(&self, index: usize) -> Result<Option<Tree>> {
        self.iter()?.nth(index).transpose()
    }

    pub fn len(&self) -> Result<usize> {
        let file = File::open(&self.path).map_err(|e| CrawlError::io(&self.path, e))?;
        let mut count = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| CrawlError::io(&self.path, e))?;
            if !line.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Drop a trailing partial line left by a write that never finished.
    /// Returns whether anything was cut.
    pub fn repair_torn_tail(&self) -> Result<bool> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| CrawlError::io(&self.path, e))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| CrawlError::io(&self.path, e))?;
        if contents.is_empty() || contents.ends_with(b"\n") {
            return Ok(false);
        }

        let keep = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        warn!(
            "Truncating torn tail of {} ({} bytes)",
            self.path.display(),
            contents.len() - keep
        );
        file.set_len(keep as u64)
            .and_then(|_| file.seek(SeekFrom::End(0)).map(|_| ()))
            .map_err(|e| CrawlError::io(&self.path, e))?;
        Ok(true)
    }

    /// Move the log to `<name>.bak`, or `<name>.bak.N` when earlier backups
    /// exist, so a fresh crawl can start without destroying it. Returns the
    /// backup path.
    pub fn move_aside(&self) -> Result<PathBuf> {
        let backup = (0..)
            .map(|n| {
                let mut name = self.path.clone().into_os_string();
                name.push(".bak");
                if n > 0 {
                    name.push(format!(".{}", n));
                }
                PathBuf::from(name)
            })
            .find(|candidate| !candidate.exists())
            .unwrap_or_else(|| self.path.with_extension("bak"));
        fs::rename(&self.path, &backup).map_err(|e| CrawlError::io(&self.path, e))?;
        debug!("Moved {} to {}", self.path.display(), backup.display());
        Ok(backup)
    }
}

/// Streams trees from a forest log. Blank lines are skipped; a line that does
/// not parse yields [`CrawlError::Corrupt`] without affecting other lines.
pub struct ForestIter {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl Iterator for ForestIter {
    type Item = Result<Tree>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(CrawlError::io(&self.path, e))),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| CrawlError::Corrupt {
                path: self.path.clone(),
                line: self.line_no,
                reason: e.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, RelationRecord};
    use tempfile::TempDir;

    fn tree(root: &str) -> Tree {
        Tree::new(vec![Layer::from(vec![RelationRecord::root(root, "t", "UC")])])
    }

    #[test]
    fn test_create_then_append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let log = ForestLog::new(dir.path().join("data").join("v0.log"));

        log.create(&tree("v0")).unwrap();
        log.append(&tree("v1")).unwrap();
        log.append(&tree("v2")).unwrap();

        assert_eq!(log.len().unwrap(), 3);
        let roots: Vec<_> = log
            .trees()
            .unwrap()
            .iter()
            .map(|t| t.root().unwrap().item.clone())
            .collect();
        assert_eq!(roots, vec!["v0", "v1", "v2"]);
        assert_eq!(log.read_tree(1).unwrap(), Some(tree("v1")));
        assert_eq!(log.read_tree(3).unwrap(), None);
    }

    #[test]
    fn test_create_truncates_existing_log() {
        let dir = TempDir::new().unwrap();
        let log = ForestLog::new(dir.path().join("v0.log"));
        log.create(&tree("a")).unwrap();
        log.append(&tree("b")).unwrap();

        log.create(&tree("c")).unwrap();
        assert_eq!(log.len().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_line_does_not_hide_earlier_lines() {
        let dir = TempDir::new().unwrap();
        let log = ForestLog::new(dir.path().join("v0.log"));
        log.create(&tree("a")).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap()
            .write_all(b"{not json}\n")
            .unwrap();

        let mut iter = log.iter().unwrap();
        assert!(iter.next().unwrap().is_ok());
        match iter.next().unwrap() {
            Err(CrawlError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt line, got {:?}", other),
        }
    }

    #[test]
    fn test_repair_torn_tail() {
        let dir = TempDir::new().unwrap();
        let log = ForestLog::new(dir.path().join("v0.log"));
        log.create(&tree("a")).unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(log.path())
            .unwrap()
            .write_all(b"[[{\"item\":\"b\"")
            .unwrap();

        assert!(log.repair_torn_tail().unwrap());
        assert!(!log.repair_torn_tail().unwrap());
        assert_eq!(log.len().unwrap(), 1);

        log.append(&tree("c")).unwrap();
        assert_eq!(log.len().unwrap(), 2);
    }

    #[test]
    fn test_move_aside() {
        let dir = TempDir::new().unwrap();
        let log = ForestLog::new(dir.path().join("v0.log"));
        log.create(&tree("a")).unwrap();

        let backup = log.move_aside().unwrap();
        assert!(!log.exists());
        assert!(backup.ends_with("v0.log.bak"));
        assert!(backup.is_file());
    }

    #[test]
    fn test_move_aside_keeps_earlier_backups() {
        let dir = TempDir::new().unwrap();
        let log = ForestLog::new(dir.path().join("v0.log"));

        log.create(&tree("first")).unwrap();
        let first = log.move_aside().unwrap();
        log.create(&tree("second")).unwrap();
        let second = log.move_aside().unwrap();
        log.create(&tree("third")).unwrap();
        let third = log.move_aside().unwrap();

        assert!(first.ends_with("v0.log.bak"));
        assert!(second.ends_with("v0.log.bak.1"));
        assert!(third.ends_with("v0.log.bak.2"));

        let root_of = |path: &PathBuf| {
            ForestLog::new(path).read_tree(0).unwrap().unwrap().root().unwrap().item.clone()
        };
        assert_eq!(root_of(&first), "first");
        assert_eq!(root_of(&second), "second");
        assert_eq!(root_of(&third), "third");
    }
}
