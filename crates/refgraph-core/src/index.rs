//! # Storage Index
//!
//! The cache of one storage instance: canonical URI -> shared entry.
//!
//! ## Acquisition Protocol
//!
//! [`StorageIndex::get_or_create`] is the only way entries enter the cache
//! outside of bulk population:
//!
//! - `Present`: already cached, no I/O
//! - `New`: recognized and cached as an invalid shell, no I/O
//! - `Fail`: unrecognized, nothing cached
//!
//! Insertion is insert-if-absent under the write lock, so concurrent
//! discovery of one URI from several traversal branches yields one instance.
//!
//! [`StorageIndex::acquire`] (user-facing) loads a new entry right away to
//! prove it is live. [`StorageIndex::discover`] (reached through references
//! of already-loaded content) trusts the URI and defers the load.

use crate::driver::StorageDriver;
use crate::entry::StorageEntry;
use crate::factory::EntryFactory;
use crate::pool::WorkerPool;
use crate::strategy::{IndexSettings, IndexingStrategy, IndexingTarget, bind_scoped};
use crate::types::{EntryKind, StorageId};
use crate::uri::StorageUri;
use crate::RefgraphError;
use regex::Regex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

// =============================================================================
// ACQUISITION & EVENTS
// =============================================================================

/// Outcome of [`StorageIndex::get_or_create`].
#[derive(Debug, Clone)]
pub enum Acquisition {
    /// The entry was already cached.
    Present(Arc<StorageEntry>),
    /// The entry was created and cached by this call.
    New(Arc<StorageEntry>),
    /// The URI maps to no entry.
    Fail,
}

impl Acquisition {
    /// The entry, unless the acquisition failed.
    #[must_use]
    pub fn entry(&self) -> Option<&Arc<StorageEntry>> {
        match self {
            Self::Present(e) | Self::New(e) => Some(e),
            Self::Fail => None,
        }
    }

    /// Consume into the entry, unless the acquisition failed.
    #[must_use]
    pub fn into_entry(self) -> Option<Arc<StorageEntry>> {
        match self {
            Self::Present(e) | Self::New(e) => Some(e),
            Self::Fail => None,
        }
    }

    /// Whether the acquisition failed.
    #[must_use]
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

/// Notification about an entry entering (or failing to enter) the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryEvent {
    /// A user acquisition created and validated an entry.
    Acquired(StorageUri),
    /// A traversal discovered an entry.
    Discovered(StorageUri),
    /// A user acquisition could not produce a live entry.
    AcquisitionFailed(StorageUri),
}

/// Receives [`EntryEvent`]s.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn notify(&self, event: EntryEvent);
}

impl<F> EventSink for F
where
    F: Fn(EntryEvent) + Send + Sync,
{
    fn notify(&self, event: EntryEvent) {
        self(event);
    }
}

// =============================================================================
// STORAGE INDEX
// =============================================================================

/// Identity-deduplicated entry cache over one storage driver.
pub struct StorageIndex {
    id: StorageId,
    factory: EntryFactory,
    pool: WorkerPool,
    cache: RwLock<HashMap<StorageUri, Arc<StorageEntry>>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl StorageIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(id: StorageId, driver: Arc<dyn StorageDriver>, pool: WorkerPool) -> Self {
        Self {
            id,
            factory: EntryFactory::new(driver),
            pool,
            cache: RwLock::new(HashMap::new()),
            sink: None,
        }
    }

    /// Create an index and populate it with the configured strategy.
    pub fn open(
        id: StorageId,
        driver: Arc<dyn StorageDriver>,
        settings: &IndexSettings,
    ) -> Result<Self, RefgraphError> {
        let index = Self::new(id, driver, settings.pool()?);
        index.refresh(settings.strategy)?;
        Ok(index)
    }

    /// Install an event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The storage instance this index belongs to.
    #[must_use]
    pub fn id(&self) -> &StorageId {
        &self.id
    }

    /// The worker pool used for bulk passes.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_cache().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_cache().is_empty()
    }

    /// The cached entry for `uri`, ignoring its version.
    #[must_use]
    pub fn get(&self, uri: &StorageUri) -> Option<Arc<StorageEntry>> {
        self.read_cache().get(&uri.canonical()).cloned()
    }

    /// All cached entries, ordered by URI.
    #[must_use]
    pub fn entities(&self) -> Vec<Arc<StorageEntry>> {
        let mut all: Vec<_> = self.read_cache().values().cloned().collect();
        all.sort_by(|a, b| a.uri().cmp(b.uri()));
        all
    }

    /// Cached entries inside `target`, ordered by URI.
    #[must_use]
    pub fn entries_for(&self, target: &IndexingTarget) -> Vec<Arc<StorageEntry>> {
        self.entities()
            .into_iter()
            .filter(|e| target.matches(e))
            .collect()
    }

    /// Return the cached entry or create and cache a shell.
    pub fn get_or_create(&self, uri: &StorageUri) -> Acquisition {
        let key = uri.canonical();
        if let Some(entry) = self.read_cache().get(&key) {
            return Acquisition::Present(Arc::clone(entry));
        }

        let entry = match self.factory.create(&key) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(uri = %key, error = %err, "no entry for URI");
                return Acquisition::Fail;
            }
        };

        let (host, orphans) = {
            let mut cache = self.write_cache();
            match cache.entry(key) {
                Entry::Occupied(existing) => return Acquisition::Present(Arc::clone(existing.get())),
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&entry));
                }
            }
            let host = entry.host().and_then(|h| cache.get(h).cloned());
            // Scoped entries discovered before their host.
            let orphans: Vec<_> = if entry.kind() == EntryKind::Object {
                cache
                    .values()
                    .filter(|c| c.host() == Some(entry.uri()))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };
            (host, orphans)
        };

        if let Some(host) = host.filter(|h| h.kind() == EntryKind::Object) {
            host.attach_scoped(Arc::clone(&entry));
        }
        for child in orphans {
            entry.attach_scoped(child);
        }
        Acquisition::New(entry)
    }

    /// User-initiated acquisition: a new entry is loaded immediately.
    ///
    /// A failed load reports `Fail`; the invalid shell stays cached.
    pub fn acquire(&self, uri: &StorageUri) -> Acquisition {
        match self.get_or_create(uri) {
            Acquisition::New(entry) => {
                entry.refresh();
                if entry.is_valid() {
                    info!(uri = %entry.uri(), "acquired entry");
                    self.emit(EntryEvent::Acquired(entry.uri().clone()));
                    Acquisition::New(entry)
                } else {
                    warn!(uri = %entry.uri(), "acquired entry could not be loaded");
                    self.emit(EntryEvent::AcquisitionFailed(entry.uri().clone()));
                    Acquisition::Fail
                }
            }
            Acquisition::Fail => {
                self.emit(EntryEvent::AcquisitionFailed(uri.canonical()));
                Acquisition::Fail
            }
            present => present,
        }
    }

    /// Traversal acquisition: a new entry is cached without loading.
    pub fn discover(&self, uri: &StorageUri) -> Option<Arc<StorageEntry>> {
        match self.get_or_create(uri) {
            Acquisition::Present(entry) => Some(entry),
            Acquisition::New(entry) => {
                debug!(uri = %entry.uri(), "discovered entry");
                self.emit(EntryEvent::Discovered(entry.uri().clone()));
                Some(entry)
            }
            Acquisition::Fail => None,
        }
    }

    /// Refresh the invalid members of `entries`, in parallel.
    pub fn validate(&self, entries: &[Arc<StorageEntry>]) {
        let invalid: Vec<_> = entries.iter().filter(|e| !e.is_valid()).cloned().collect();
        if invalid.is_empty() {
            return;
        }
        debug!(entries = invalid.len(), "validating entries");
        self.pool.for_each(&invalid, |entry| entry.refresh());
    }

    /// Force a refresh of every member of `entries`, in parallel.
    pub fn revalidate(&self, entries: &[Arc<StorageEntry>]) {
        debug!(entries = entries.len(), "revalidating entries");
        self.pool.for_each(entries, |entry| entry.refresh());
    }

    /// Discard the cache and repopulate it with `strategy`.
    ///
    /// Returns the number of cached entries afterwards.
    pub fn refresh(&self, strategy: IndexingStrategy) -> Result<usize, RefgraphError> {
        let fresh = strategy.fetch_entries(
            self.factory.driver().as_ref(),
            &IndexingTarget::any(),
            |uri| self.factory.create(uri).ok(),
            &self.pool,
        )?;
        let mut cache = self.write_cache();
        *cache = fresh;
        info!(storage = %self.id, %strategy, entries = cache.len(), "index refreshed");
        Ok(cache.len())
    }

    /// Re-run `strategy` over the part of the store inside `target`.
    ///
    /// The cache is not cleared: cached entries keep their identity and
    /// adopt the fresh state, unknown ones are inserted. Returns the number
    /// of entries the pass produced.
    pub fn refresh_target(
        &self,
        strategy: IndexingStrategy,
        target: &IndexingTarget,
    ) -> Result<usize, RefgraphError> {
        let fresh = strategy.fetch_entries(
            self.factory.driver().as_ref(),
            target,
            |uri| self.factory.create(uri).ok(),
            &self.pool,
        )?;
        let produced = fresh.len();
        let all = {
            let mut cache = self.write_cache();
            for (key, entry) in fresh {
                match cache.entry(key) {
                    Entry::Occupied(cached) => {
                        cached.get().accept(&entry);
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(entry);
                    }
                }
            }
            cache.values().cloned().collect::<Vec<_>>()
        };
        bind_scoped(&all);
        info!(storage = %self.id, %strategy, produced, "target refreshed");
        Ok(produced)
    }

    /// Camel-hump search over cached URIs.
    ///
    /// `/`-separated sections; inside a section any characters may precede
    /// an uppercase letter (except the first) and follow the section, so
    /// `docs/OrgExDoc` finds `docs:/org_example_Document/...`-style URIs
    /// whose text contains `docs`, then `/`, then `Org..Ex..Doc`.
    pub fn search(&self, query: &str) -> Result<Vec<Arc<StorageEntry>>, RefgraphError> {
        let Some(pattern) = search_pattern(query) else {
            return Ok(Vec::new());
        };
        let regex = Regex::new(&pattern)
            .map_err(|e| RefgraphError::InvalidArgument(format!("bad search query: {}", e)))?;
        Ok(self
            .entities()
            .into_iter()
            .filter(|e| regex.is_match(&e.uri().to_string()))
            .collect())
    }

    /// Entries whose reference set names `target`.
    ///
    /// Scans the whole index; invalid entries are loaded in bulk first.
    #[must_use]
    pub fn referrers_of(&self, target: &StorageEntry) -> Vec<Arc<StorageEntry>> {
        let all = self.entities();
        self.validate(&all);
        referrers_within(&all, target.uri())
    }

    fn emit(&self, event: EntryEvent) {
        if let Some(sink) = &self.sink {
            sink.notify(event);
        }
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<StorageUri, Arc<StorageEntry>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<StorageUri, Arc<StorageEntry>>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StorageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageIndex")
            .field("id", &self.id)
            .field("entries", &self.len())
            .field("workers", &self.pool.workers())
            .finish()
    }
}

/// Members of `entries` whose loaded reference set names `target`.
pub(crate) fn referrers_within(
    entries: &[Arc<StorageEntry>],
    target: &StorageUri,
) -> Vec<Arc<StorageEntry>> {
    entries
        .iter()
        .filter(|e| e.uri() != target)
        .filter(|e| {
            e.uri_properties_strict()
                .iter()
                .any(|p| p.uri.equal_ignoring_version(target))
        })
        .cloned()
        .collect()
}

/// Build the camel-hump regex for a search query; `None` for a blank query.
fn search_pattern(query: &str) -> Option<String> {
    let sections: Vec<String> = query
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|section| {
            let mut out = String::new();
            for (i, c) in section.chars().enumerate() {
                if i > 0 && c.is_uppercase() {
                    out.push_str(".*");
                }
                out.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4])));
            }
            out.push_str(".*");
            out
        })
        .collect();
    if sections.is_empty() {
        return None;
    }
    Some(sections.join("/"))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    fn uri(s: &str) -> StorageUri {
        StorageUri::parse(s).expect("valid uri")
    }

    fn index_over(store: &Arc<MemoryStore>) -> StorageIndex {
        StorageIndex::new(StorageId::new("test"), store.clone(), WorkerPool::new(4).expect("pool"))
    }

    #[test]
    fn versions_share_one_entry() {
        let store = Arc::new(MemoryStore::new());
        let index = index_over(&store);
        let first = index.get_or_create(&uri("docs:/org_example_Doc/a.v1"));
        let second = index.get_or_create(&uri("docs:/org_example_Doc/a.v2"));
        assert!(matches!(first, Acquisition::New(_)));
        assert!(matches!(second, Acquisition::Present(_)));
        let (a, b) = (first.into_entry().expect("a"), second.into_entry().expect("b"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(index.len(), 1);
        assert_eq!(store.loads(), 0);
    }

    #[test]
    fn unknown_type_fails_without_caching() {
        let store = Arc::new(MemoryStore::new());
        let index = index_over(&store);
        assert!(index.get_or_create(&uri("docs:/storedRef/orphan")).is_fail());
        assert!(index.is_empty());
    }

    #[test]
    fn acquire_loads_and_reports() {
        let store = Arc::new(MemoryStore::new());
        store.put("docs:/org_example_Doc/a", json!({})).expect("put");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let index = index_over(&store).with_event_sink(Arc::new(move |event: EntryEvent| {
            sink_events.lock().expect("events").push(event);
        }));

        let ok = index.acquire(&uri("docs:/org_example_Doc/a"));
        assert!(ok.entry().expect("entry").is_valid());
        let missing = index.acquire(&uri("docs:/org_example_Doc/missing"));
        assert!(missing.is_fail());
        assert_eq!(index.len(), 2);

        let again = index.acquire(&uri("docs:/org_example_Doc/a"));
        assert!(matches!(again, Acquisition::Present(_)));

        let events = events.lock().expect("events");
        assert_eq!(
            *events,
            vec![
                EntryEvent::Acquired(uri("docs:/org_example_Doc/a")),
                EntryEvent::AcquisitionFailed(uri("docs:/org_example_Doc/missing")),
            ]
        );
    }

    #[test]
    fn discover_does_not_load() {
        let store = Arc::new(MemoryStore::new());
        store.put("docs:/org_example_Doc/a", json!({})).expect("put");
        let index = index_over(&store);
        let entry = index.discover(&uri("docs:/org_example_Doc/a")).expect("entry");
        assert!(!entry.is_valid());
        assert_eq!(store.loads(), 0);
        assert!(index.discover(&uri("docs:/x")).is_none());
    }

    #[test]
    fn scoped_entry_attaches_to_cached_host() {
        let store = Arc::new(MemoryStore::new());
        let index = index_over(&store);
        let host = index.discover(&uri("docs:/org_example_Doc/h")).expect("host");
        let child = index
            .discover(&uri("docs:/org_example_Doc/h/storedmap/refs"))
            .expect("child");
        assert_eq!(host.scoped_children().len(), 1);
        assert!(Arc::ptr_eq(&host.scoped_children()[0], &child));
    }

    #[test]
    fn host_adopts_scoped_entries_cached_before_it() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("docs:/org_example_Doc/h", json!({"title": "Host"}))
            .expect("put");
        store
            .put_list(
                "docs:/org_example_Doc/h/storedlist/items",
                &["docs:/org_example_Doc/x"],
            )
            .expect("put");
        let index = index_over(&store);
        let child = index
            .discover(&uri("docs:/org_example_Doc/h/storedlist/items"))
            .expect("child");
        index
            .discover(&uri("docs:/org_example_Doc/other"))
            .expect("unrelated");
        let host = index.discover(&uri("docs:/org_example_Doc/h.v2")).expect("host");

        assert_eq!(host.scoped_children().len(), 1);
        assert!(Arc::ptr_eq(&host.scoped_children()[0], &child));
        assert!(host.references(&child));
    }

    #[test]
    fn validate_and_revalidate() {
        let store = Arc::new(MemoryStore::new());
        store.put("docs:/org_example_Doc/a", json!({})).expect("put");
        store.put("docs:/org_example_Doc/b", json!({})).expect("put");
        let index = index_over(&store);
        index.refresh(IndexingStrategy::Initial).expect("refresh");
        let all = index.entities();
        index.validate(&all);
        assert!(all.iter().all(|e| e.is_valid()));
        assert_eq!(store.loads(), 2);
        index.validate(&all);
        assert_eq!(store.loads(), 2);
        index.revalidate(&all);
        assert_eq!(store.loads(), 4);
    }

    #[test]
    fn refresh_replaces_and_refresh_target_preserves() {
        let store = Arc::new(MemoryStore::new());
        store.put("docs:/org_example_Doc/a", json!({})).expect("put");
        let index = index_over(&store);
        assert_eq!(index.refresh(IndexingStrategy::OnDemand).expect("refresh"), 0);
        assert_eq!(index.refresh(IndexingStrategy::Initial).expect("refresh"), 1);

        let cached = index.get(&uri("docs:/org_example_Doc/a")).expect("cached");
        store
            .put("docs:/org_example_Doc/a", json!({"r": "docs:/org_example_Doc/b"}))
            .expect("put");
        store.put("docs:/org_example_Doc/b", json!({})).expect("put");

        let produced = index
            .refresh_target(IndexingStrategy::Full, &IndexingTarget::any())
            .expect("refresh target");
        assert_eq!(produced, 2);
        assert_eq!(index.len(), 2);
        let after = index.get(&uri("docs:/org_example_Doc/a")).expect("cached");
        assert!(Arc::ptr_eq(&cached, &after));
        assert!(after.is_valid());
        assert_eq!(after.uri_properties_strict().len(), 1);
    }

    #[test]
    fn camel_hump_search() {
        let store = Arc::new(MemoryStore::new());
        let index = index_over(&store);
        index.discover(&uri("docs:/org_example_DocumentPart/a1")).expect("a1");
        index.discover(&uri("docs:/org_example_Person/p1")).expect("p1");
        let found = index.search("DocPa").expect("search");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uri().to_string(), "docs:/org_example_DocumentPart/a1");
        assert_eq!(index.search("org/p1").expect("search").len(), 1);
        assert!(index.search("").expect("search").is_empty());
        assert!(index.search("(").expect("escaped").is_empty());
    }

    #[test]
    fn referrers_scan_the_index() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("docs:/org_example_Doc/a", json!({"r": "docs:/org_example_Doc/c"}))
            .expect("put");
        store
            .put("docs:/org_example_Doc/b", json!({"r": "docs:/org_example_Doc/c.v3"}))
            .expect("put");
        store.put("docs:/org_example_Doc/c", json!({})).expect("put");
        let index = index_over(&store);
        index.refresh(IndexingStrategy::Initial).expect("refresh");
        let c = index.get(&uri("docs:/org_example_Doc/c")).expect("c");
        let referrers: Vec<String> = index
            .referrers_of(&c)
            .iter()
            .map(|e| e.uri().to_string())
            .collect();
        assert_eq!(referrers, vec!["docs:/org_example_Doc/a", "docs:/org_example_Doc/b"]);
    }
}
