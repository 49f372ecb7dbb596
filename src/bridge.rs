//! Carries the cache from the server process to the client process.
//!
//! The server calls [`serialize_cache`] once its preloads have settled and
//! embeds the string verbatim in the document. The client calls
//! [`initialize_cache`] with that exact string before its first render pass.

use metrics::counter;
use tracing::{info, warn};

use crate::cache::{CacheError, CacheStore};

pub(crate) const METRIC_RESTORE: &str = "fetch_cache_restore_total";

/// Snapshot every settled entry. Keys still being fetched are not included.
pub fn serialize_cache(store: &CacheStore) -> Result<String, CacheError> {
    let snapshot = store.serialize()?;
    info!(entries = store.len(), bytes = snapshot.len(), "cache serialized");
    Ok(snapshot)
}

/// Replace the store with a snapshot. Never merges.
///
/// A snapshot that does not decode to a key → entry mapping is rejected as
/// [`CacheError::Malformed`] and the store keeps its prior contents.
pub fn initialize_cache(store: &CacheStore, snapshot: &str) -> Result<(), CacheError> {
    match store.deserialize(snapshot) {
        Ok(()) => {
            counter!(METRIC_RESTORE, "outcome" => "applied").increment(1);
            info!(entries = store.len(), "cache initialized from snapshot");
            Ok(())
        }
        Err(err) => {
            counter!(METRIC_RESTORE, "outcome" => "rejected").increment(1);
            warn!(error = %err, "rejected cache snapshot");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::CacheEntry;

    #[test]
    fn round_trip_reproduces_keys_and_entries() {
        let server = CacheStore::new();
        server.set("/api/people", CacheEntry::Resolved(json!([{"id": 1, "name": "Ann"}])));
        server.set("/api/empty", CacheEntry::Resolved(json!(null)));
        server.set("/api/gone", CacheEntry::Failed("upstream responded with status 404".into()));

        let snapshot = serialize_cache(&server).expect("serialize");
        let client = CacheStore::new();
        initialize_cache(&client, &snapshot).expect("initialize");

        assert_eq!(client.keys(), server.keys());
        for key in server.keys() {
            assert_eq!(client.get(&key), server.get(&key), "{key}");
        }
    }

    #[test]
    fn empty_store_round_trips() {
        let snapshot = serialize_cache(&CacheStore::new()).expect("serialize");
        assert_eq!(snapshot, "{}");

        let client = CacheStore::new();
        initialize_cache(&client, &snapshot).expect("initialize");
        assert!(client.is_empty());
    }

    #[test]
    fn initialize_replaces_rather_than_merges() {
        let client = CacheStore::new();
        client.set("/local", CacheEntry::Resolved(json!(1)));

        initialize_cache(&client, r#"{"/remote":{"data":2,"error":null}}"#).expect("initialize");

        assert!(client.get("/local").is_none());
        assert!(client.has("/remote"));
    }

    #[test]
    fn not_json_is_malformed_and_store_is_unchanged() {
        let client = CacheStore::new();

        let err = initialize_cache(&client, "not json").expect_err("rejected");

        assert!(matches!(err, CacheError::Malformed(_)));
        assert!(client.is_empty());
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let client = CacheStore::new();
        client.set("/prior", CacheEntry::Resolved(json!("kept")));

        for snapshot in [
            "null",
            "42",
            r#"["/a"]"#,
            r#"{"/a":"cached"}"#,
            r#"{"/a":{"error":7}}"#,
            r#"{"/a":{}}"#,
            r#"{"/api/people":{"datum":[1],"err":"x"}}"#,
        ] {
            assert!(
                matches!(initialize_cache(&client, snapshot), Err(CacheError::Malformed(_))),
                "{snapshot}"
            );
        }
        assert_eq!(client.get("/prior"), Some(CacheEntry::Resolved(json!("kept"))));
        assert!(!client.has("/api/people"));
    }
}
