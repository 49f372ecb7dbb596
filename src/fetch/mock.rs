//! Scripted [`Fetcher`] for tests and local rendering without a backend.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;

use super::{FetchError, FetchResponse, Fetcher};

#[derive(Debug, Clone)]
enum Route {
    Respond(FetchResponse),
    Transport(String),
}

/// Serves canned responses per key and counts every request.
///
/// Unknown keys answer `404`. [`hold`](Self::hold) parks every request until
/// [`release`](Self::release), which lets tests line up concurrent callers.
pub struct MockFetcher {
    routes: DashMap<String, Route>,
    calls: DashMap<String, usize>,
    total: AtomicUsize,
    open: watch::Sender<bool>,
}

impl MockFetcher {
    pub fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self {
            routes: DashMap::new(),
            calls: DashMap::new(),
            total: AtomicUsize::new(0),
            open,
        }
    }

    pub fn respond(&self, key: &str, status: u16, body: impl Into<String>) {
        self.routes.insert(
            key.to_string(),
            Route::Respond(FetchResponse::new(status, body)),
        );
    }

    pub fn respond_json(&self, key: &str, body: Value) {
        self.respond(key, 200, body.to_string());
    }

    pub fn fail_transport(&self, key: &str, message: &str) {
        self.routes
            .insert(key.to_string(), Route::Transport(message.to_string()));
    }

    pub fn hold(&self) {
        self.open.send_replace(false);
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }

    /// Requests received for `key`, including ones still parked.
    pub fn calls(&self, key: &str) -> usize {
        self.calls.get(key).map(|count| *count).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn request(&self, key: &str) -> Result<FetchResponse, FetchError> {
        *self.calls.entry(key.to_string()).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        let mut open = self.open.subscribe();
        if open.wait_for(|open| *open).await.is_err() {
            return Err(FetchError::Transport("mock fetcher dropped".to_string()));
        }

        let route = self.routes.get(key).map(|route| route.value().clone());
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Transport(message)) => Err(FetchError::Transport(message)),
            None => Ok(FetchResponse::new(404, "")),
        }
    }
}
