//! # Storage Driver Interfaces
//!
//! The core never touches physical storage. It talks to three collaborator
//! traits, bundled into [`StorageDriver`]:
//!
//! - [`ContentLoader`]: record bodies, current and historical
//! - [`UriEnumerator`]: bulk listing for the eager indexing strategies
//! - [`CollectionAccessor`]: typed access to lists, maps and sequences
//!
//! [`MemoryStore`] implements all three in memory and counts every load.

mod memory;

pub use memory::MemoryStore;

use crate::primitives::{COLLECTION_URIS_KEY, SEQUENCE_CURRENT_KEY};
use crate::types::RawContent;
use crate::uri::StorageUri;
use crate::RefgraphError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Loads record content.
pub trait ContentLoader: Send + Sync {
    /// Load the content addressed by `uri`.
    ///
    /// A canonical URI yields the latest version, a versioned URI that
    /// exact version.
    fn load(&self, uri: &StorageUri) -> Result<RawContent, RefgraphError>;

    /// All stored versions of `uri`, oldest first.
    fn load_history(&self, uri: &StorageUri) -> Result<Vec<RawContent>, RefgraphError> {
        Ok(vec![self.load(&uri.canonical())?])
    }
}

/// Lists every URI resident in the store.
pub trait UriEnumerator: Send + Sync {
    /// Canonical, store-relative URIs.
    fn list_all(&self) -> Result<Vec<StorageUri>, RefgraphError>;
}

/// Typed access to collection entries.
pub trait CollectionAccessor: Send + Sync {
    /// Elements of a stored list, in order.
    fn list_elements(&self, uri: &StorageUri) -> Result<Vec<StorageUri>, RefgraphError>;

    /// Entries of a stored map.
    fn map_entries(&self, uri: &StorageUri) -> Result<BTreeMap<String, StorageUri>, RefgraphError>;

    /// Current value of a stored sequence, `None` if it was never set.
    fn sequence_value(&self, uri: &StorageUri) -> Result<Option<i64>, RefgraphError>;
}

/// A complete storage backend.
pub trait StorageDriver: ContentLoader + UriEnumerator + CollectionAccessor {}

impl<T: ContentLoader + UriEnumerator + CollectionAccessor> StorageDriver for T {}

// =============================================================================
// COLLECTION BODIES
// =============================================================================
//
// Drivers that keep collections as JSON documents share these readers:
// lists are `{"uris": [...]}`, maps `{"uris": {...}}`, sequences
// `{"current": n}`.

/// Read list elements from a collection body.
pub fn list_from_body(uri: &StorageUri, body: &Value) -> Result<Vec<StorageUri>, RefgraphError> {
    let items = body
        .get(COLLECTION_URIS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            RefgraphError::Deserialization(format!("{} has no `{}` list", uri, COLLECTION_URIS_KEY))
        })?;
    items
        .iter()
        .map(|item| {
            StorageUri::from_value(item).ok_or_else(|| {
                RefgraphError::Deserialization(format!("{} holds a non-URI element {}", uri, item))
            })
        })
        .collect()
}

/// Read map entries from a collection body.
pub fn map_from_body(
    uri: &StorageUri,
    body: &Value,
) -> Result<BTreeMap<String, StorageUri>, RefgraphError> {
    let entries = body
        .get(COLLECTION_URIS_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            RefgraphError::Deserialization(format!("{} has no `{}` map", uri, COLLECTION_URIS_KEY))
        })?;
    entries
        .iter()
        .map(|(key, item)| {
            StorageUri::from_value(item)
                .map(|target| (key.clone(), target))
                .ok_or_else(|| {
                    RefgraphError::Deserialization(format!(
                        "{} holds a non-URI value under {}",
                        uri, key
                    ))
                })
        })
        .collect()
}

/// Read a sequence counter from a collection body.
#[must_use]
pub fn sequence_from_body(body: &Value) -> Option<i64> {
    body.get(SEQUENCE_CURRENT_KEY).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uri(s: &str) -> StorageUri {
        StorageUri::parse(s).expect("valid uri")
    }

    #[test]
    fn reads_list_body() {
        let list = uri("docs:/storedlist/all");
        let items = list_from_body(&list, &json!({"uris": ["docs:/T/a", "docs:/T/b"]}))
            .expect("list");
        assert_eq!(items.len(), 2);
        assert!(list_from_body(&list, &json!({"uris": ["nope"]})).is_err());
        assert!(list_from_body(&list, &json!({})).is_err());
    }

    #[test]
    fn reads_map_body() {
        let map = uri("docs:/storedmap/index");
        let entries = map_from_body(&map, &json!({"uris": {"k": "docs:/T/a"}})).expect("map");
        assert_eq!(entries.get("k").map(ToString::to_string), Some("docs:/T/a".into()));
    }

    #[test]
    fn reads_sequence_body() {
        assert_eq!(sequence_from_body(&json!({"current": 41})), Some(41));
        assert_eq!(sequence_from_body(&json!({})), None);
    }
}
