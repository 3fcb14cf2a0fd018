use relgraph_api::ApiError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// The root of a tree could not be resolved. Fatal for that tree.
    #[error("Could not resolve tree root {item}: {reason}")]
    AuthoritativeLookup { item: String, reason: String },

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(ApiError),

    /// Any other failure talking to the discovery API. The crawler handles it
    /// exactly like quota exhaustion.
    #[error("Fetch failed: {0}")]
    Fetch(ApiError),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt record in {} at line {line}: {reason}", path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl CrawlError {
    pub fn is_quota(&self) -> bool {
        matches!(self, CrawlError::QuotaExceeded(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CrawlError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ApiError> for CrawlError {
    fn from(err: ApiError) -> Self {
        if err.is_quota() {
            CrawlError::QuotaExceeded(err)
        } else {
            CrawlError::Fetch(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, CrawlError>;
