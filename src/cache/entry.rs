//! Cached fetch outcomes.
//!
//! An entry is written once a fetch settles. Keys whose fetch is still running
//! have no entry; they are tracked by [`InFlightFetches`](super::InFlightFetches).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fetch::FetchError;

/// Settled outcome of one fetch for one key.
///
/// On the wire this is always `{"data": <json>, "error": <string|null>}`.
/// A populated `error` marks a failed entry; anything else is resolved,
/// including a resolved body that is itself `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEntry", into = "WireEntry")]
pub enum CacheEntry {
    Resolved(Value),
    Failed(String),
}

/// Lifecycle position of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Resolved,
    Failed,
}

impl CacheEntry {
    pub fn from_outcome(outcome: Result<Value, FetchError>) -> Self {
        match outcome {
            Ok(data) => Self::Resolved(data),
            Err(error) => Self::Failed(error.to_string()),
        }
    }

    pub fn status(&self) -> EntryStatus {
        match self {
            Self::Resolved(_) => EntryStatus::Resolved,
            Self::Failed(_) => EntryStatus::Failed,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Resolved(data) => Some(data),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Resolved(_) => None,
            Self::Failed(error) => Some(error),
        }
    }
}

/// Both keys are always written. On read, an absent key is told apart from an
/// explicit `null`, and anything besides `data` and `error` is rejected.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEntry {
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    error: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TryFrom<WireEntry> for CacheEntry {
    type Error = String;

    fn try_from(wire: WireEntry) -> Result<Self, Self::Error> {
        match (wire.data, wire.error.flatten()) {
            (None | Some(Value::Null), Some(error)) => Ok(Self::Failed(error)),
            (Some(_), Some(_)) => Err("entry holds both `data` and `error`".to_string()),
            (Some(data), None) => Ok(Self::Resolved(data)),
            (None, None) => Err("entry holds neither `data` nor `error`".to_string()),
        }
    }
}

impl From<CacheEntry> for WireEntry {
    fn from(entry: CacheEntry) -> Self {
        match entry {
            CacheEntry::Resolved(data) => Self {
                data: Some(data),
                error: Some(None),
            },
            CacheEntry::Failed(error) => Self {
                data: Some(Value::Null),
                error: Some(Some(error)),
            },
        }
    }
}
