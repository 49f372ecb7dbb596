//! Per-call-site data access.
//!
//! A [`FetchConsumer`] belongs to one call site in the render tree. The render
//! loop calls [`FetchConsumer::use_fetch`] on every evaluation and re-renders
//! when [`FetchConsumer::settled`] returns.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStore, FetchWaiter};
use crate::client::{FetchCache, Lookup};
use crate::fetch::FetchError;

/// What a call site renders from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerView {
    pub is_loading: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ConsumerView {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn resolved(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn from_entry(entry: CacheEntry) -> Self {
        match entry {
            CacheEntry::Resolved(data) => Self::resolved(data),
            CacheEntry::Failed(error) => Self::failed(error),
        }
    }

    fn from_outcome(outcome: Result<Value, FetchError>) -> Self {
        match outcome {
            Ok(data) => Self::resolved(data),
            Err(err) => Self::failed(err.to_string()),
        }
    }
}

/// Call-site state that is not in the store.
#[derive(Default)]
pub enum LocalFetch {
    /// Nothing running for this call site; the store is authoritative.
    #[default]
    Idle,
    /// Waiting on a fetch this call site started or joined.
    Waiting(FetchWaiter),
    /// A fetch was needed but could not be started.
    Unavailable(FetchError),
}

/// Project the store and the call site's local state into a view.
pub fn view(store: &CacheStore, key: &str, local: &LocalFetch) -> ConsumerView {
    match local {
        LocalFetch::Waiting(waiter) => waiter
            .current()
            .map(ConsumerView::from_outcome)
            .unwrap_or_else(ConsumerView::loading),
        LocalFetch::Unavailable(err) => ConsumerView::failed(err.to_string()),
        LocalFetch::Idle => store
            .get(key)
            .map(ConsumerView::from_entry)
            .unwrap_or_default(),
    }
}

pub struct FetchConsumer {
    cache: Arc<FetchCache>,
    key: Option<String>,
    local: LocalFetch,
}

impl FetchConsumer {
    pub fn new(cache: Arc<FetchCache>) -> Self {
        Self {
            cache,
            key: None,
            local: LocalFetch::Idle,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Evaluate the call site for `key`.
    ///
    /// The first evaluation for a key checks the store before anything can
    /// suspend: a hydrated or preloaded key is returned with no request. On a
    /// genuine miss exactly one fetch is started (or an existing one joined)
    /// and the view reports loading. Never panics and never returns an error;
    /// failures arrive in [`ConsumerView::error`].
    pub fn use_fetch(&mut self, key: &str) -> ConsumerView {
        if self.key.as_deref() != Some(key) {
            if let Some(previous) = self.key.as_deref() {
                debug!(previous, key, "call site switched keys");
            }
            self.key = Some(key.to_string());
            self.local = match self.cache.lookup(key) {
                Lookup::Settled(_) => LocalFetch::Idle,
                Lookup::Pending(waiter) => LocalFetch::Waiting(waiter),
                Lookup::Unavailable(err) => LocalFetch::Unavailable(err),
            };
        }
        view(self.cache.store(), key, &self.local)
    }

    /// Wait for the fetch this call site depends on and return the new view.
    ///
    /// Returns immediately when nothing is running.
    pub async fn settled(&mut self) -> ConsumerView {
        if let LocalFetch::Waiting(waiter) = &mut self.local {
            let outcome = waiter.wait().await;
            debug!(key = self.key.as_deref(), ok = outcome.is_ok(), "call site settled");
        }
        match self.key.as_deref() {
            Some(key) => view(self.cache.store(), key, &self.local),
            None => ConsumerView::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::{CacheConfig, FailurePolicy};
    use crate::fetch::Fetcher;
    use crate::fetch::mock::MockFetcher;

    fn shared(fetcher: &Arc<MockFetcher>, policy: FailurePolicy) -> Arc<FetchCache> {
        Arc::new(FetchCache::new(
            CacheConfig::with_failure_policy(policy),
            Arc::clone(fetcher) as Arc<dyn Fetcher>,
        ))
    }

    #[test]
    fn view_of_unknown_key_is_empty() {
        let store = CacheStore::new();
        assert_eq!(view(&store, "/x", &LocalFetch::Idle), ConsumerView::default());
    }

    #[test]
    fn view_reads_settled_entries_from_store() {
        let store = CacheStore::new();
        store.set("/ok", CacheEntry::Resolved(json!([1])));
        store.set("/bad", CacheEntry::Failed("boom".to_string()));

        assert_eq!(
            view(&store, "/ok", &LocalFetch::Idle),
            ConsumerView::resolved(json!([1]))
        );
        assert_eq!(
            view(&store, "/bad", &LocalFetch::Idle),
            ConsumerView::failed("boom")
        );
    }

    #[test]
    fn view_serializes_with_camel_case_fields() {
        let encoded = serde_json::to_value(ConsumerView::loading()).expect("view encodes");
        assert_eq!(
            encoded,
            json!({"isLoading": true, "data": null, "error": null})
        );
    }

    #[tokio::test]
    async fn miss_reports_loading_then_data() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond_json("/api/people", json!([{"id": 1}]));
        let cache = shared(&fetcher, FailurePolicy::Terminal);
        let mut consumer = FetchConsumer::new(cache);

        assert_eq!(consumer.use_fetch("/api/people"), ConsumerView::loading());
        assert_eq!(
            consumer.settled().await,
            ConsumerView::resolved(json!([{"id": 1}]))
        );
        assert_eq!(
            consumer.use_fetch("/api/people"),
            ConsumerView::resolved(json!([{"id": 1}]))
        );
        assert_eq!(fetcher.calls("/api/people"), 1);
    }

    #[tokio::test]
    async fn non_success_response_becomes_error_view_and_failed_entry() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond("/api/x", 500, "oops");
        let cache = shared(&fetcher, FailurePolicy::Terminal);
        let mut consumer = FetchConsumer::new(Arc::clone(&cache));

        consumer.use_fetch("/api/x");
        let settled = consumer.settled().await;

        assert!(!settled.is_loading);
        assert!(settled.data.is_none());
        assert!(settled.error.is_some());
        assert_eq!(
            cache.store().get("/api/x").map(|entry| entry.status()),
            Some(crate::cache::EntryStatus::Failed)
        );
    }

    #[tokio::test]
    async fn terminal_failure_is_not_refetched_by_new_call_sites() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond("/api/x", 404, "");
        let cache = shared(&fetcher, FailurePolicy::Terminal);

        let mut first = FetchConsumer::new(Arc::clone(&cache));
        first.use_fetch("/api/x");
        first.settled().await;

        for _ in 0..3 {
            let mut again = FetchConsumer::new(Arc::clone(&cache));
            let view = again.use_fetch("/api/x");
            assert_eq!(view, ConsumerView::failed("upstream responded with status 404"));
        }
        assert_eq!(fetcher.calls("/api/x"), 1);
    }

    #[tokio::test]
    async fn retry_failure_is_refetched_by_new_call_site() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond("/api/x", 503, "");
        let cache = shared(&fetcher, FailurePolicy::Retry);

        let mut first = FetchConsumer::new(Arc::clone(&cache));
        first.use_fetch("/api/x");
        assert!(first.settled().await.error.is_some());

        fetcher.respond_json("/api/x", json!("recovered"));
        let mut second = FetchConsumer::new(Arc::clone(&cache));
        assert!(second.use_fetch("/api/x").is_loading);
        assert_eq!(
            second.settled().await,
            ConsumerView::resolved(json!("recovered"))
        );
        assert_eq!(fetcher.calls("/api/x"), 2);
    }

    #[tokio::test]
    async fn repeated_evaluation_with_same_key_does_not_refetch_or_relookup() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond("/api/x", 503, "");
        let cache = shared(&fetcher, FailurePolicy::Retry);
        let mut consumer = FetchConsumer::new(cache);

        consumer.use_fetch("/api/x");
        consumer.settled().await;
        let view = consumer.use_fetch("/api/x");

        assert!(view.error.is_some());
        assert_eq!(fetcher.calls("/api/x"), 1);
    }

    #[tokio::test]
    async fn key_change_starts_fresh_and_ignores_old_fetch() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.respond_json("/old", json!("old"));
        fetcher.respond_json("/new", json!("new"));
        fetcher.hold();
        let cache = shared(&fetcher, FailurePolicy::Terminal);
        let mut consumer = FetchConsumer::new(Arc::clone(&cache));

        assert!(consumer.use_fetch("/old").is_loading);
        assert!(consumer.use_fetch("/new").is_loading);
        assert_eq!(consumer.key(), Some("/new"));

        fetcher.release();
        assert_eq!(consumer.settled().await, ConsumerView::resolved(json!("new")));

        // The abandoned fetch still completes and lands in the store.
        let mut other = FetchConsumer::new(Arc::clone(&cache));
        other.use_fetch("/old");
        assert_eq!(other.settled().await, ConsumerView::resolved(json!("old")));
        assert_eq!(fetcher.calls("/old"), 1);
    }

    #[tokio::test]
    async fn settled_without_key_is_empty() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = shared(&fetcher, FailurePolicy::Terminal);
        let mut consumer = FetchConsumer::new(cache);

        assert_eq!(consumer.settled().await, ConsumerView::default());
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[test]
    fn consumer_without_runtime_reports_error_instead_of_panicking() {
        let fetcher = Arc::new(MockFetcher::new());
        let cache = shared(&fetcher, FailurePolicy::Terminal);
        let mut consumer = FetchConsumer::new(cache);

        let view = consumer.use_fetch("/api/x");

        assert!(!view.is_loading);
        assert!(view.error.is_some());
    }
}
