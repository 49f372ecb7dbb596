//! Keys with a fetch currently running.
//!
//! The marker is taken synchronously, before the fetch is awaited, so a second
//! caller for the same key joins the running fetch instead of starting its own.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::sync::watch;

use crate::fetch::FetchError;

pub type Outcome = Result<Value, FetchError>;

type Slots = DashMap<String, watch::Receiver<Option<Outcome>>>;

#[derive(Default, Clone)]
pub struct InFlightFetches {
    slots: Arc<Slots>,
}

/// Result of trying to take the in-flight marker for a key.
pub enum Claim {
    /// The caller owns the fetch and must settle the ticket.
    Leader(FetchTicket, FetchWaiter),
    /// Someone else is fetching; wait on their outcome.
    Joined(FetchWaiter),
}

impl InFlightFetches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the marker for `key`, or join the fetch that holds it.
    ///
    /// `recheck` runs while the key's slot is locked and only when no fetch is
    /// running. Returning `Some` aborts the claim; the caller uses that value
    /// instead. Pass the store lookup here so an outcome written just before
    /// the marker was released is not missed.
    pub fn claim<T>(
        &self,
        key: &str,
        recheck: impl FnOnce() -> Option<T>,
    ) -> Result<Claim, T> {
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(occupied) => {
                Ok(Claim::Joined(FetchWaiter::new(occupied.get().clone())))
            }
            Entry::Vacant(vacant) => {
                if let Some(settled) = recheck() {
                    return Err(settled);
                }
                let (sender, receiver) = watch::channel(None);
                vacant.insert(receiver.clone());
                Ok(Claim::Leader(
                    FetchTicket {
                        key: key.to_string(),
                        sender,
                        slots: Arc::clone(&self.slots),
                        released: false,
                    },
                    FetchWaiter::new(receiver),
                ))
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Ownership of one running fetch. Dropping it releases the marker; waiters
/// that never saw an outcome observe [`FetchError::Aborted`].
pub struct FetchTicket {
    key: String,
    sender: watch::Sender<Option<Outcome>>,
    slots: Arc<Slots>,
    released: bool,
}

impl FetchTicket {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the marker, then publish the outcome to every waiter.
    ///
    /// The outcome must already be in the store: a caller that finds the
    /// marker gone falls back to the store lookup.
    pub fn complete(mut self, outcome: Outcome) {
        self.release();
        self.sender.send_replace(Some(outcome));
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.slots.remove(&self.key);
        }
    }
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle on the outcome of a running fetch.
pub struct FetchWaiter {
    receiver: watch::Receiver<Option<Outcome>>,
    settled: Option<Outcome>,
}

impl FetchWaiter {
    fn new(receiver: watch::Receiver<Option<Outcome>>) -> Self {
        Self {
            receiver,
            settled: None,
        }
    }

    /// Outcome if the fetch has already settled. Never blocks.
    pub fn current(&self) -> Option<Outcome> {
        if let Some(outcome) = &self.settled {
            return Some(outcome.clone());
        }
        self.receiver.borrow().clone()
    }

    pub async fn wait(&mut self) -> Outcome {
        if let Some(outcome) = &self.settled {
            return outcome.clone();
        }

        let published = match self.receiver.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        let outcome = published.unwrap_or_else(|| {
            Err(FetchError::Aborted(
                "fetch ended before producing a result".to_string(),
            ))
        });
        self.settled = Some(outcome.clone());
        outcome
    }
}
