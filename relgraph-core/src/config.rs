//! Credentials, on-disk layout and crawl targets.

use crate::error::{CrawlError, Result};
use crate::model::ItemId;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Single API key; aggressive mode hands each worker its key through this.
pub const API_KEY_ENV: &str = "RELGRAPH_API_KEY";
/// Comma-separated list of API keys.
pub const API_KEYS_ENV: &str = "RELGRAPH_API_KEYS";

/// Where credentials may come from, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub api_key: Option<String>,
    pub env_key: Option<String>,
    pub keys_file: Option<PathBuf>,
    pub env_keys: Option<String>,
}

impl CredentialSources {
    /// Command-line values plus whatever the environment provides.
    pub fn with_env(api_key: Option<String>, keys_file: Option<PathBuf>) -> Self {
        Self {
            api_key,
            env_key: std::env::var(API_KEY_ENV).ok(),
            keys_file,
            env_keys: std::env::var(API_KEYS_ENV).ok(),
        }
    }
}

/// An ordered list of API keys. Never prints a key in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    keys: Vec<String>,
}

impl Credentials {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// One key per line; blank lines and `#` comments are ignored.
    pub fn parse_key_file(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn parse_comma_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn from_key_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CrawlError::io(path, e))?;
        Ok(Self::parse_key_file(&contents))
    }

    /// The first source that yields at least one key wins.
    pub fn resolve(sources: &CredentialSources) -> Result<Self> {
        if let Some(key) = &sources.api_key {
            let creds = Self::new([key.as_str()]);
            if !creds.is_empty() {
                debug!("Using API key from command line");
                return Ok(creds);
            }
        }
        if let Some(key) = &sources.env_key {
            let creds = Self::new([key.as_str()]);
            if !creds.is_empty() {
                debug!("Using API key from {}", API_KEY_ENV);
                return Ok(creds);
            }
        }
        if let Some(path) = &sources.keys_file {
            let creds = Self::from_key_file(path)?;
            if !creds.is_empty() {
                debug!("Loaded {} API keys from {}", creds.len(), path.display());
                return Ok(creds);
            }
        }
        if let Some(list) = &sources.env_keys {
            let creds = Self::parse_comma_list(list);
            if !creds.is_empty() {
                debug!("Loaded {} API keys from {}", creds.len(), API_KEYS_ENV);
                return Ok(creds);
            }
        }

        Err(CrawlError::InvalidOptions(format!(
            "no API key configured (use --api-key, --keys-file, {} or {})",
            API_KEY_ENV, API_KEYS_ENV
        )))
    }

    pub fn select(&self, index: usize) -> Result<&str> {
        self.keys.get(index).map(String::as_str).ok_or_else(|| {
            CrawlError::InvalidOptions(format!(
                "credential index {} out of range ({} keys configured)",
                index,
                self.keys.len()
            ))
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.keys.iter().map(|k| mask_key(k)))
            .finish()
    }
}

/// `****` followed by the last four characters of `key`.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", tail)
}

/// One independent forest/checkpoint pair: the seed plus an optional suffix
/// that keeps parallel workers apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub seed: ItemId,
    pub suffix: String,
}

impl CrawlTarget {
    pub fn new(seed: impl Into<ItemId>) -> Self {
        Self {
            seed: seed.into(),
            suffix: String::new(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Target of the `index`-th aggressive worker.
    pub fn worker(seed: impl Into<ItemId>, index: usize) -> Self {
        Self::new(seed).with_suffix(worker_suffix(index))
    }

    pub fn file_stem(&self) -> String {
        format!("{}{}", self.seed, self.suffix)
    }
}

pub fn worker_suffix(index: usize) -> String {
    format!("-k{}", index)
}

/// Directory tree under `--data-dir`:
///
/// ```text
/// <root>/data/    forest logs and checkpoint files
/// <root>/graphs/  exported channel graphs
/// <root>/titles/  title extracts
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// `~` in `root` is expanded to the home directory.
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(shellexpand::tilde(root).as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn graphs_dir(&self) -> PathBuf {
        self.root.join("graphs")
    }

    pub fn titles_dir(&self) -> PathBuf {
        self.root.join("titles")
    }

    pub fn forest_path(&self, target: &CrawlTarget) -> PathBuf {
        self.data_dir().join(format!("{}.log", target.file_stem()))
    }

    pub fn checkpoint_path(&self, target: &CrawlTarget) -> PathBuf {
        self.data_dir()
            .join(format!("{}_breakpoint.txt", target.file_stem()))
    }

    /// A log named on the command line: absolute paths are used as given,
    /// anything else is looked up under `data/`.
    pub fn resolve_log(&self, name: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(name).as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.data_dir(), self.graphs_dir(), self.titles_dir()] {
            fs::create_dir_all(&dir).map_err(|e| CrawlError::io(&dir, e))?;
        }
        Ok(())
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
