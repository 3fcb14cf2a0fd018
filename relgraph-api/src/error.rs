use thiserror::Error;

/// Reasons the discovery API uses in its error envelope when a key has run
/// out of quota or is being throttled.
pub const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API quota exceeded ({reason}): {message}")]
    QuotaExceeded { reason: String, message: String },

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn is_quota(&self) -> bool {
        matches!(self, ApiError::QuotaExceeded { .. })
    }
}

// Request URLs are dropped; they may carry credentials or other query data.
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Http(err.without_url())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
