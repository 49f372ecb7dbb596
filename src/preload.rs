//! Server-side preloading.
//!
//! Preloads run before rendering so every consumer in the render pass finds
//! its key settled. They share the in-flight set with consumers, so a preload
//! never issues a second request for a key that is already being fetched.

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheEntry;
use crate::client::{FetchCache, Lookup};
use crate::fetch::FetchError;

impl FetchCache {
    /// Fetch `key` into the store.
    ///
    /// On failure the failed entry is written *and* the error is returned, so
    /// the caller can decide between aborting the render and a degraded page.
    #[instrument(skip(self))]
    pub async fn preload(&self, key: &str) -> Result<(), FetchError> {
        match self.lookup(key) {
            Lookup::Settled(CacheEntry::Resolved(_)) => {
                debug!("already resolved, nothing to preload");
                Ok(())
            }
            Lookup::Settled(CacheEntry::Failed(error)) => {
                warn!(error = %error, "key already failed");
                Err(FetchError::Recorded(error))
            }
            Lookup::Pending(mut waiter) => match waiter.wait().await {
                Ok(_) => {
                    info!("preloaded into cache");
                    Ok(())
                }
                Err(err) => {
                    warn!(error = %err, "preload failed");
                    Err(err)
                }
            },
            Lookup::Unavailable(err) => {
                warn!(error = %err, "preload could not start");
                Err(err)
            }
        }
    }

    /// Preload every key concurrently and wait for all of them.
    ///
    /// Results come back in input order, paired with their key.
    pub async fn preload_all<I, K>(&self, keys: I) -> Vec<(String, Result<(), FetchError>)>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let results = join_all(keys.iter().map(|key| self.preload(key))).await;
        keys.into_iter().zip(results).collect()
    }
}
