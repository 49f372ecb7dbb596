use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The snapshot did not decode to a key → entry mapping. Nothing was applied.
    #[error("malformed cache snapshot: {0}")]
    Malformed(String),
    #[error("failed to encode cache snapshot: {0}")]
    Encode(String),
}

impl CacheError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    pub fn encode(reason: impl Into<String>) -> Self {
        Self::Encode(reason.into())
    }
}
