//! Cache configuration.
//!
//! Loaded from the `[cache]` table of `fetch-cache.toml` or `FETCH_CACHE__CACHE__*`.

use serde::Deserialize;

/// What a consumer does when it finds a failed entry for its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Failures are final for the process lifetime. No re-fetch.
    #[default]
    Terminal,
    /// A failed key is fetched again on the next fresh consumer evaluation.
    Retry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub failure_policy: FailurePolicy,
}

impl CacheConfig {
    pub fn with_failure_policy(failure_policy: FailurePolicy) -> Self {
        Self { failure_policy }
    }

    /// Returns true when failed entries should be treated as misses.
    pub fn retries_failures(&self) -> bool {
        self.failure_policy == FailurePolicy::Retry
    }
}
