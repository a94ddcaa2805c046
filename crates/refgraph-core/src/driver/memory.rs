//! In-memory storage driver.
//!
//! Holds every record as a JSON body (collections included, in their
//! `{"uris": ...}` / `{"current": n}` shape) and counts loads per URI so
//! callers can assert on I/O.

use super::{CollectionAccessor, ContentLoader, UriEnumerator};
use crate::types::RawContent;
use crate::uri::StorageUri;
use crate::RefgraphError;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

/// A mutable, in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Canonical URI -> versions, oldest first.
    records: RwLock<BTreeMap<StorageUri, Vec<RawContent>>>,
    /// URIs whose loads fail.
    broken: RwLock<BTreeSet<StorageUri>>,
    /// URIs left out of `list_all`.
    hidden: RwLock<BTreeSet<StorageUri>>,
    loads: AtomicUsize,
    per_uri: Mutex<HashMap<StorageUri, usize>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an unversioned record.
    pub fn put(&self, uri: &str, body: Value) -> Result<StorageUri, RefgraphError> {
        let uri = StorageUri::parse(uri)?.canonical();
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.clone(), vec![RawContent::new(body)]);
        Ok(uri)
    }

    /// Append a new version of a record.
    pub fn put_version(&self, uri: &str, body: Value) -> Result<StorageUri, RefgraphError> {
        let uri = StorageUri::parse(uri)?.canonical();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let versions = records.entry(uri.clone()).or_default();
        let next = versions.iter().filter_map(|c| c.version).max().unwrap_or(0) + 1;
        versions.push(RawContent::versioned(next, body));
        Ok(uri)
    }

    /// Insert a stored list.
    pub fn put_list(&self, uri: &str, elements: &[&str]) -> Result<StorageUri, RefgraphError> {
        self.put(uri, json!({ "uris": elements }))
    }

    /// Insert a stored map.
    pub fn put_map(&self, uri: &str, entries: &[(&str, &str)]) -> Result<StorageUri, RefgraphError> {
        let map: serde_json::Map<String, Value> = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
            .collect();
        self.put(uri, json!({ "uris": map }))
    }

    /// Insert a stored sequence.
    pub fn put_sequence(&self, uri: &str, current: i64) -> Result<StorageUri, RefgraphError> {
        self.put(uri, json!({ "current": current }))
    }

    /// Make every load of `uri` fail (or succeed again).
    pub fn set_broken(&self, uri: &StorageUri, broken: bool) {
        let mut set = self.broken.write().unwrap_or_else(PoisonError::into_inner);
        if broken {
            set.insert(uri.canonical());
        } else {
            set.remove(&uri.canonical());
        }
    }

    /// Keep `uri` out of enumeration; it stays loadable.
    pub fn hide(&self, uri: &StorageUri) {
        self.hidden
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.canonical());
    }

    /// Total number of loads served.
    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Loads served for one URI, ignoring version.
    #[must_use]
    pub fn loads_of(&self, uri: &StorageUri) -> usize {
        self.per_uri
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uri.canonical())
            .copied()
            .unwrap_or(0)
    }

    fn record_load(&self, uri: &StorageUri) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        *self
            .per_uri
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(uri.canonical())
            .or_insert(0) += 1;
    }

    fn versions(&self, uri: &StorageUri) -> Result<Vec<RawContent>, RefgraphError> {
        self.record_load(uri);
        let key = uri.canonical();
        if self
            .broken
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
        {
            return Err(RefgraphError::load_failed(uri, "record is unreadable"));
        }
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .filter(|versions| !versions.is_empty())
            .cloned()
            .ok_or_else(|| RefgraphError::load_failed(uri, "no such record"))
    }

    fn latest_body(&self, uri: &StorageUri) -> Result<Value, RefgraphError> {
        self.load(uri).map(|content| content.body)
    }
}

impl ContentLoader for MemoryStore {
    fn load(&self, uri: &StorageUri) -> Result<RawContent, RefgraphError> {
        let versions = self.versions(uri)?;
        let found = match uri.version() {
            Some(v) => versions.into_iter().find(|c| c.version == Some(v)),
            None => versions.into_iter().last(),
        };
        found.ok_or_else(|| RefgraphError::load_failed(uri, "no such version"))
    }

    fn load_history(&self, uri: &StorageUri) -> Result<Vec<RawContent>, RefgraphError> {
        self.versions(uri)
    }
}

impl UriEnumerator for MemoryStore {
    fn list_all(&self) -> Result<Vec<StorageUri>, RefgraphError> {
        let hidden = self.hidden.read().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|uri| !hidden.contains(*uri))
            .cloned()
            .collect())
    }
}

impl CollectionAccessor for MemoryStore {
    fn list_elements(&self, uri: &StorageUri) -> Result<Vec<StorageUri>, RefgraphError> {
        super::list_from_body(uri, &self.latest_body(uri)?)
    }

    fn map_entries(&self, uri: &StorageUri) -> Result<BTreeMap<String, StorageUri>, RefgraphError> {
        super::map_from_body(uri, &self.latest_body(uri)?)
    }

    fn sequence_value(&self, uri: &StorageUri) -> Result<Option<i64>, RefgraphError> {
        Ok(super::sequence_from_body(&self.latest_body(uri)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_loads_per_uri() {
        let store = MemoryStore::new();
        let a = store.put("docs:/T/a", json!({"x": 1})).expect("put");
        assert_eq!(store.loads(), 0);
        store.load(&a).expect("load");
        store.load(&a.at_version(9)).ok();
        assert_eq!(store.loads_of(&a), 2);
        assert_eq!(store.loads(), 2);
    }

    #[test]
    fn versions_are_appended() {
        let store = MemoryStore::new();
        let a = store.put_version("docs:/T/a", json!({"n": 1})).expect("v1");
        store.put_version("docs:/T/a", json!({"n": 2})).expect("v2");
        assert_eq!(store.load(&a).expect("latest").body["n"], 2);
        assert_eq!(store.load(&a.at_version(1)).expect("v1").body["n"], 1);
        assert_eq!(store.load_history(&a).expect("history").len(), 2);
    }

    #[test]
    fn broken_and_missing_records_fail() {
        let store = MemoryStore::new();
        let a = store.put("docs:/T/a", json!({})).expect("put");
        store.set_broken(&a, true);
        assert!(store.load(&a).is_err());
        store.set_broken(&a, false);
        assert!(store.load(&a).is_ok());
        let missing = StorageUri::parse("docs:/T/none").expect("uri");
        assert!(store.load(&missing).is_err());
    }

    #[test]
    fn hidden_records_are_not_listed() {
        let store = MemoryStore::new();
        let a = store.put("docs:/T/a", json!({})).expect("put");
        store.put("docs:/T/b", json!({})).expect("put");
        store.hide(&a);
        assert_eq!(store.list_all().expect("list").len(), 1);
        assert!(store.load(&a).is_ok());
    }
}
