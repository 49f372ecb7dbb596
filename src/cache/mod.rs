//! Fetch cache internals.
//!
//! - [`CacheStore`]: settled outcomes per key, snapshot encode/decode
//! - [`InFlightFetches`]: keys with a fetch running right now
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! failure_policy = "terminal" # or "retry"
//! ```

mod config;
mod entry;
mod error;
mod inflight;
mod lock;
mod store;

pub use config::{CacheConfig, FailurePolicy};
pub use entry::{CacheEntry, EntryStatus};
pub use error::CacheError;
pub use inflight::{Claim, FetchTicket, FetchWaiter, InFlightFetches, Outcome};
pub use store::CacheStore;
