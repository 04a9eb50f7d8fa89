use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single upstream request. Each variant carries the URL that
/// was requested.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("error status: {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("connection error: {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    pub fn url(&self) -> &str {
        match self {
            UpstreamError::Status { url, .. }
            | UpstreamError::Transport { url, .. }
            | UpstreamError::Decode { url, .. } => url,
        }
    }
}
