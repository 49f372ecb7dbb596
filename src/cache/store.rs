//! Settled fetch outcomes keyed by request identifier.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tracing::debug;

use super::entry::CacheEntry;
use super::error::CacheError;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Process-wide key → entry map.
///
/// Keys are compared by exact string identity. Each write replaces the whole
/// entry for its key; there are no partial updates.
#[derive(Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, entry: CacheEntry) {
        rw_write(&self.entries, SOURCE, "set").insert(key.into(), entry);
    }

    /// True only for a resolved entry. Failed keys and keys still being
    /// fetched do not count.
    pub fn has(&self, key: &str) -> bool {
        rw_read(&self.entries, SOURCE, "has")
            .get(key)
            .is_some_and(CacheEntry::is_resolved)
    }

    /// Encode the whole map. Keys are emitted in sorted order so equal stores
    /// produce equal strings.
    pub fn serialize(&self) -> Result<String, CacheError> {
        let guard = rw_read(&self.entries, SOURCE, "serialize");
        let ordered: BTreeMap<&str, &CacheEntry> =
            guard.iter().map(|(key, entry)| (key.as_str(), entry)).collect();
        serde_json::to_string(&ordered).map_err(|err| CacheError::encode(err.to_string()))
    }

    /// Replace the whole map with a decoded snapshot.
    ///
    /// Decoding finishes before the lock is taken, so a malformed snapshot
    /// leaves the current contents untouched.
    pub fn deserialize(&self, snapshot: &str) -> Result<(), CacheError> {
        let decoded: HashMap<String, CacheEntry> =
            serde_json::from_str(snapshot).map_err(|err| CacheError::malformed(err.to_string()))?;
        let count = decoded.len();
        *rw_write(&self.entries, SOURCE, "deserialize") = decoded;
        debug!(entries = count, "cache store replaced from snapshot");
        Ok(())
    }

    pub fn reset(&self) {
        *rw_write(&self.entries, SOURCE, "reset") = HashMap::new();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently holding a settled entry, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = rw_read(&self.entries, SOURCE, "keys")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
