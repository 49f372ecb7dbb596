//! Per-process fetch cache context.
//!
//! One [`FetchCache`] is built per process (server render or browser session)
//! and shared by reference with every preloader and consumer.

use std::sync::Arc;

use metrics::counter;
use tokio::runtime::Handle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::cache::{
    CacheConfig, CacheEntry, CacheStore, Claim, EntryStatus, FetchTicket, FetchWaiter,
    InFlightFetches,
};
use crate::fetch::{FetchError, Fetcher, fetch_json};

pub(crate) const METRIC_HIT: &str = "fetch_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "fetch_cache_miss_total";
pub(crate) const METRIC_JOIN: &str = "fetch_cache_join_total";
pub(crate) const METRIC_REQUEST: &str = "fetch_cache_request_total";

/// What a synchronous lookup found for a key.
pub enum Lookup {
    /// A settled entry the current policy accepts. No fetch was issued.
    Settled(CacheEntry),
    /// A fetch is running, either just started by this lookup or joined.
    Pending(FetchWaiter),
    /// A fetch was needed but could not be started.
    Unavailable(FetchError),
}

pub struct FetchCache {
    config: CacheConfig,
    store: Arc<CacheStore>,
    inflight: InFlightFetches,
    fetcher: Arc<dyn Fetcher>,
}

impl FetchCache {
    pub fn new(config: CacheConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            store: Arc::new(CacheStore::new()),
            inflight: InFlightFetches::new(),
            fetcher,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn inflight(&self) -> &InFlightFetches {
        &self.inflight
    }

    /// `None` means the key was never requested in this process.
    pub fn status(&self, key: &str) -> Option<EntryStatus> {
        if self.inflight.contains(key) {
            return Some(EntryStatus::Pending);
        }
        self.store.get(key).map(|entry| entry.status())
    }

    /// Clear all settled entries. Fetches already running still write their
    /// outcome when they finish.
    pub fn reset(&self) {
        self.store.reset();
        info!("fetch cache reset");
    }

    /// Check the store, then the in-flight set, and start a fetch only on a
    /// genuine miss. Runs without suspending; the fetch itself is spawned.
    pub fn lookup(&self, key: &str) -> Lookup {
        if let Some(entry) = self.accepted(key) {
            counter!(METRIC_HIT).increment(1);
            debug!(key, outcome = "hit", "served from cache");
            return Lookup::Settled(entry);
        }

        match self.inflight.claim(key, || self.accepted(key)) {
            Err(entry) => {
                counter!(METRIC_HIT).increment(1);
                debug!(key, outcome = "hit", "served from cache after recheck");
                Lookup::Settled(entry)
            }
            Ok(Claim::Joined(waiter)) => {
                counter!(METRIC_JOIN).increment(1);
                debug!(key, outcome = "join", "joined running fetch");
                Lookup::Pending(waiter)
            }
            Ok(Claim::Leader(ticket, waiter)) => {
                counter!(METRIC_MISS).increment(1);
                match self.spawn_fetch(ticket) {
                    Ok(()) => Lookup::Pending(waiter),
                    Err(err) => Lookup::Unavailable(err),
                }
            }
        }
    }

    fn accepted(&self, key: &str) -> Option<CacheEntry> {
        self.store
            .get(key)
            .filter(|entry| entry.is_resolved() || !self.config.retries_failures())
    }

    fn spawn_fetch(&self, ticket: FetchTicket) -> Result<(), FetchError> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                warn!(key = ticket.key(), error = %err, "no async runtime to run fetch");
                return Err(FetchError::Aborted(format!("no async runtime: {err}")));
            }
        };

        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let span = info_span!("fetch", key = %ticket.key());

        handle.spawn(
            async move {
                info!("requesting from network");
                let outcome = fetch_json(fetcher.as_ref(), ticket.key()).await;
                match &outcome {
                    Ok(_) => {
                        counter!(METRIC_REQUEST, "outcome" => "resolved").increment(1);
                        info!(outcome = "resolved", "fetch settled");
                    }
                    Err(err) => {
                        counter!(METRIC_REQUEST, "outcome" => "failed").increment(1);
                        warn!(outcome = "failed", error = %err, "fetch settled");
                    }
                }
                store.set(ticket.key(), CacheEntry::from_outcome(outcome.clone()));
                ticket.complete(outcome);
            }
            .instrument(span),
        );
        Ok(())
    }
}
