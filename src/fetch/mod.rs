//! Network collaborator seam.
//!
//! The cache never talks to the network directly. It asks a [`Fetcher`] for
//! the raw response to a key and decides success and decoding itself.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod mock;

/// Why a fetch for a key produced no data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("upstream responded with status {status}")]
    Status { status: u16 },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("response body is not valid JSON: {0}")]
    Decode(String),
    #[error("cannot build a request for `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("fetch aborted: {0}")]
    Aborted(String),
    /// A failure settled earlier for this key, carried as its message.
    #[error("{0}")]
    Recorded(String),
}

/// Raw response handed back by a [`Fetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues exactly one request per call. Retries and caching are not its job.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn request(&self, key: &str) -> Result<FetchResponse, FetchError>;
}

/// Request `key` and parse the body as JSON.
pub async fn fetch_json(fetcher: &dyn Fetcher, key: &str) -> Result<Value, FetchError> {
    let response = fetcher.request(key).await?;
    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
        });
    }
    serde_json::from_str(&response.body).map_err(|err| FetchError::Decode(err.to_string()))
}
