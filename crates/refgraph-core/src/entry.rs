//! # Storage Entries
//!
//! A [`StorageEntry`] is the cached projection of one store record. The
//! variant set is closed ([`EntryKind`]); each variant has its own rule for
//! computing references, behind the same two calls:
//!
//! - [`StorageEntry::uri_properties`]: the reference set, loading first if
//!   the entry is not valid
//! - [`StorageEntry::refresh`]: reload content, recompute references and
//!   label
//!
//! Entries are shared as `Arc<StorageEntry>`; equality and hashing use the
//! canonical URI only. Refreshes of one entry are serialized by its state
//! lock, different entries refresh independently.

use crate::driver::StorageDriver;
use crate::flatten;
use crate::primitives::ERROR_LABEL;
use crate::property::{PropertyPath, Segment, UriProperty};
use crate::types::{EntryKind, RawContent};
use crate::uri::StorageUri;
use crate::RefgraphError;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, warn};

/// Content of an object entry, as needed by property resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryContent {
    /// A single-version record.
    Single(Value),
    /// Every stored version, oldest first.
    Multi(Vec<RawContent>),
}

#[derive(Debug, Clone, Default)]
struct EntryState {
    valid: bool,
    properties: BTreeSet<UriProperty>,
    label: Option<String>,
    current: Option<i64>,
}

impl EntryState {
    fn failed() -> Self {
        Self {
            label: Some(ERROR_LABEL.to_string()),
            ..Self::default()
        }
    }
}

/// One cached store entry.
pub struct StorageEntry {
    uri: StorageUri,
    kind: EntryKind,
    host: Option<StorageUri>,
    driver: Arc<dyn StorageDriver>,
    state: Mutex<EntryState>,
    scoped: RwLock<Vec<Arc<StorageEntry>>>,
}

impl StorageEntry {
    /// Create an invalid entry shell. Performs no I/O.
    #[must_use]
    pub fn new(
        uri: &StorageUri,
        kind: EntryKind,
        host: Option<StorageUri>,
        driver: Arc<dyn StorageDriver>,
    ) -> Self {
        Self {
            uri: uri.canonical(),
            kind,
            host: host.map(|h| h.canonical()),
            driver,
            state: Mutex::new(EntryState::default()),
            scoped: RwLock::new(Vec::new()),
        }
    }

    /// The canonical identity URI.
    #[must_use]
    pub fn uri(&self) -> &StorageUri {
        &self.uri
    }

    /// The variant.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// The host object's URI, for scoped entries.
    #[must_use]
    pub fn host(&self) -> Option<&StorageUri> {
        self.host.as_ref()
    }

    /// Whether the entry lives inside a host object.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.host.is_some()
    }

    /// The storage schema (the URI scheme).
    #[must_use]
    pub fn schema(&self) -> &str {
        self.uri.scheme()
    }

    /// Type name: derived from the URI for objects, the variant name otherwise.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self.kind {
            EntryKind::Object => self.uri.type_name(),
            other => other.as_str(),
        }
    }

    /// Whether content has been loaded successfully.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lock_state().valid
    }

    /// Reload content and recompute references and label.
    ///
    /// Never fails: a load error leaves the entry invalid with the error
    /// label, and is only logged.
    pub fn refresh(&self) {
        let mut state = self.lock_state();
        self.refresh_locked(&mut state);
    }

    /// Current reference set, loading content first if the entry is invalid.
    ///
    /// Attached scoped children appear as extra standalone properties.
    #[must_use]
    pub fn uri_properties(&self) -> BTreeSet<UriProperty> {
        let mut properties = {
            let mut state = self.lock_state();
            if !state.valid {
                self.refresh_locked(&mut state);
            }
            state.properties.clone()
        };
        properties.extend(self.scoped_properties());
        properties
    }

    /// Reference set without triggering a load: empty unless valid.
    #[must_use]
    pub fn uri_properties_strict(&self) -> BTreeSet<UriProperty> {
        let mut properties = {
            let state = self.lock_state();
            if !state.valid {
                return BTreeSet::new();
            }
            state.properties.clone()
        };
        properties.extend(self.scoped_properties());
        properties
    }

    /// Whether this entry references `other`, ignoring versions.
    #[must_use]
    pub fn references(&self, other: &StorageEntry) -> bool {
        self.uri_properties()
            .iter()
            .any(|p| p.uri.equal_ignoring_version(&other.uri))
    }

    /// Display label.
    ///
    /// Computed from the URI until the first refresh; `<<LOAD ERROR>>`
    /// after a failed one.
    #[must_use]
    pub fn label(&self) -> String {
        self.lock_state()
            .label
            .clone()
            .unwrap_or_else(|| self.uri_label())
    }

    /// Counter value of a sequence, `-1` when unset or not a sequence.
    #[must_use]
    pub fn current(&self) -> i64 {
        let mut state = self.lock_state();
        if !state.valid {
            self.refresh_locked(&mut state);
        }
        state.current.unwrap_or(-1)
    }

    /// Adopt the reference state of a fresh instance of the same entry.
    ///
    /// Returns `false` (and changes nothing) when `other` is a different
    /// entry, another variant, or not valid.
    pub fn accept(&self, other: &StorageEntry) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.kind != other.kind || self.uri != other.uri {
            return false;
        }
        let snapshot = other.lock_state().clone();
        if !snapshot.valid {
            return false;
        }
        *self.lock_state() = snapshot;
        true
    }

    /// Attach a scoped child. Attaching the same child twice is a no-op.
    pub fn attach_scoped(&self, child: Arc<StorageEntry>) {
        let mut scoped = self.scoped.write().unwrap_or_else(PoisonError::into_inner);
        if !scoped.iter().any(|c| c.uri == child.uri) {
            debug!(host = %self.uri, child = %child.uri, "attached scoped entry");
            scoped.push(child);
        }
    }

    /// Attached scoped children.
    #[must_use]
    pub fn scoped_children(&self) -> Vec<Arc<StorageEntry>> {
        self.scoped
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load the content of an object entry for property resolution.
    ///
    /// Single-version records yield their body, others their full history.
    pub fn load_content(&self) -> Result<EntryContent, RefgraphError> {
        if self.kind != EntryKind::Object {
            return Err(RefgraphError::NotAnObject(self.uri.to_string()));
        }
        if self.uri.is_single_version() {
            return Ok(EntryContent::Single(self.driver.load(&self.uri)?.body));
        }
        Ok(EntryContent::Multi(self.driver.load_history(&self.uri)?))
    }

    fn lock_state(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_locked(&self, state: &mut EntryState) {
        match self.load_state() {
            Ok(fresh) => {
                debug!(uri = %self.uri, references = fresh.properties.len(), "refreshed entry");
                *state = fresh;
            }
            Err(err) => {
                warn!(uri = %self.uri, error = %err, "refresh failed");
                *state = EntryState::failed();
            }
        }
    }

    fn load_state(&self) -> Result<EntryState, RefgraphError> {
        let mut state = EntryState {
            valid: true,
            ..EntryState::default()
        };
        match self.kind {
            EntryKind::Object => {
                let content = self.driver.load(&self.uri)?;
                let body = content.as_object().ok_or_else(|| {
                    RefgraphError::Deserialization(format!("{} is not a JSON object", self.uri))
                })?;
                state.properties = flatten::uri_properties(body);
                state.label = Some(object_label(self.type_name(), body));
            }
            EntryKind::List => {
                state.properties = self
                    .driver
                    .list_elements(&self.uri)?
                    .into_iter()
                    .enumerate()
                    .map(|(idx, uri)| {
                        UriProperty::new(PropertyPath::from(vec![Segment::Idx(idx)]), uri)
                    })
                    .collect();
                state.label = Some(self.uri_label());
            }
            EntryKind::Map => {
                state.properties = self
                    .driver
                    .map_entries(&self.uri)?
                    .into_iter()
                    .map(|(key, uri)| UriProperty::standalone(key, uri))
                    .collect();
                state.label = Some(self.uri_label());
            }
            EntryKind::Sequence => {
                state.current = self.driver.sequence_value(&self.uri)?;
                state.label = Some(self.uri_label());
            }
        }
        Ok(state)
    }

    fn scoped_properties(&self) -> Vec<UriProperty> {
        self.scoped
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|child| UriProperty::standalone(child.uri.uuid(), child.uri.clone()))
            .collect()
    }

    fn uri_label(&self) -> String {
        match self.kind {
            EntryKind::Object => self.uri.type_name().to_string(),
            _ => format!("{} / {}", self.uri.scheme(), self.uri.collection_name()),
        }
    }
}

/// `TypeName (name)` when the body carries a name, else `TypeName`.
fn object_label(type_name: &str, body: &serde_json::Map<String, Value>) -> String {
    let name = body
        .get("name")
        .filter(|v| !v.is_null())
        .or_else(|| body.get("data").and_then(|d| d.get("name")).filter(|v| !v.is_null()));
    match name {
        Some(Value::String(s)) if !s.is_empty() => format!("{} ({})", type_name, s),
        Some(Value::String(_)) | None => type_name.to_string(),
        Some(other) => format!("{} ({})", type_name, other),
    }
}

impl PartialEq for StorageEntry {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for StorageEntry {}

impl Hash for StorageEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}

impl fmt::Debug for StorageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEntry")
            .field("uri", &self.uri)
            .field("kind", &self.kind)
            .field("host", &self.host)
            .finish()
    }
}

impl fmt::Display for StorageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// =============================================================================
// TESTS
// =============================================================================
