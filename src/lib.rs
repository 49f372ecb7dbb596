//! Request-deduplicating data cache shared between server-side preloading and
//! client-side consumers.
//!
//! A server process builds a [`FetchCache`], awaits [`FetchCache::preload`]
//! for the keys a page needs, then embeds [`serialize_cache`] output in the
//! document. The client process hands that string to [`initialize_cache`]
//! before its first render, so [`FetchConsumer::use_fetch`] sees the same data
//! synchronously and issues no request.

pub mod bridge;
pub mod cache;
pub mod client;
pub mod config;
pub mod consumer;
pub mod fetch;
pub mod infra;
pub mod preload;

pub use bridge::{initialize_cache, serialize_cache};
pub use cache::{CacheConfig, CacheEntry, CacheError, CacheStore, EntryStatus, FailurePolicy};
pub use client::{FetchCache, Lookup};
pub use consumer::{ConsumerView, FetchConsumer};
pub use fetch::{FetchError, FetchResponse, Fetcher};
