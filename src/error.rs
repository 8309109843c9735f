use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced to callers of the job registry
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("keyword must have between {min} and {max} characters, got {len}")]
    InvalidKeyword { len: usize, min: usize, max: usize },

    #[error("crawl job {0} not found")]
    JobNotFound(String),

    #[error("invalid origin '{url}': {reason}")]
    InvalidOrigin { url: String, reason: String },

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Reasons a single page contributes nothing to a crawl.
/// These never leave the task that fetched the page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("content type '{0}' is not text/html")]
    NotHtml(String),

    #[error("response has no body")]
    EmptyBody,
}
