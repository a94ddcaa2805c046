//! # Indexing Strategies
//!
//! How eagerly an index is bulk-populated:
//!
//! - `ON_DEMAND`: nothing up front, entries appear through acquisition only
//! - `INITIAL`: create a shell per enumerated URI and bind scoped children
//! - `FULL`: as `INITIAL`, then load every entry
//!
//! Strategies are stateless; the work runs on a [`WorkerPool`], and single
//! entry failures are dropped from the result instead of aborting the batch.

use crate::driver::StorageDriver;
use crate::entry::StorageEntry;
use crate::pool::{WorkerPool, default_workers};
use crate::types::EntryKind;
use crate::uri::StorageUri;
use crate::RefgraphError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Entries produced by a population pass, keyed by canonical URI.
pub type EntryMap = HashMap<StorageUri, Arc<StorageEntry>>;

// =============================================================================
// STRATEGY
// =============================================================================

/// Population policy of a storage index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexingStrategy {
    /// No bulk population.
    OnDemand,
    /// Shells for every stored URI, scoped children bound.
    #[default]
    Initial,
    /// Shells plus an eager load of every entry.
    Full,
}

impl IndexingStrategy {
    /// Enumerate the store and populate entries matching `target`.
    ///
    /// `ON_DEMAND` does not even enumerate.
    pub fn fetch_entries<F>(
        &self,
        driver: &dyn StorageDriver,
        target: &IndexingTarget,
        creator: F,
        pool: &WorkerPool,
    ) -> Result<EntryMap, RefgraphError>
    where
        F: Fn(&StorageUri) -> Option<Arc<StorageEntry>> + Sync,
    {
        if *self == Self::OnDemand {
            return Ok(EntryMap::new());
        }
        let uris = driver.list_all()?;
        info!(strategy = %self, uris = uris.len(), "enumerated store");
        Ok(self.process_entries(
            &uris,
            |uri| creator(uri).filter(|entry| target.matches(entry)),
            pool,
        ))
    }

    /// Create one entry per resolvable URI and run the strategy's passes.
    pub fn process_entries<F>(&self, uris: &[StorageUri], creator: F, pool: &WorkerPool) -> EntryMap
    where
        F: Fn(&StorageUri) -> Option<Arc<StorageEntry>> + Sync,
    {
        if *self == Self::OnDemand {
            return EntryMap::new();
        }

        let created: Vec<Arc<StorageEntry>> = pool
            .map(uris, |uri| creator(uri))
            .into_iter()
            .flatten()
            .flatten()
            .collect();
        let dropped = uris.len().saturating_sub(created.len());
        if dropped > 0 {
            debug!(dropped, "unresolvable URIs skipped");
        }

        bind_scoped(&created);

        let entries = if *self == Self::Full {
            pool.for_each(&created, |entry| entry.refresh());
            let before = created.len();
            let loaded: Vec<_> = created.into_iter().filter(|e| e.is_valid()).collect();
            if loaded.len() < before {
                info!(failed = before - loaded.len(), "entries failed to load");
            }
            loaded
        } else {
            created
        };

        let map: EntryMap = entries
            .into_iter()
            .map(|entry| (entry.uri().clone(), entry))
            .collect();
        info!(strategy = %self, entries = map.len(), "population finished");
        map
    }
}

/// Attach every scoped entry to the object whose URI is its host.
pub fn bind_scoped<'a>(entries: impl IntoIterator<Item = &'a Arc<StorageEntry>> + Clone) {
    let mut by_host: HashMap<&StorageUri, Vec<&Arc<StorageEntry>>> = HashMap::new();
    for entry in entries.clone() {
        if let Some(host) = entry.host() {
            by_host.entry(host).or_default().push(entry);
        }
    }
    if by_host.is_empty() {
        return;
    }
    for entry in entries {
        if entry.kind() != EntryKind::Object {
            continue;
        }
        if let Some(children) = by_host.get(entry.uri()) {
            for child in children {
                entry.attach_scoped(Arc::clone(child));
            }
        }
    }
}

impl fmt::Display for IndexingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OnDemand => "ON_DEMAND",
            Self::Initial => "INITIAL",
            Self::Full => "FULL",
        };
        f.write_str(s)
    }
}

impl FromStr for IndexingStrategy {
    type Err = RefgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ON_DEMAND" => Ok(Self::OnDemand),
            "INITIAL" => Ok(Self::Initial),
            "FULL" => Ok(Self::Full),
            _ => Err(RefgraphError::InvalidArgument(format!(
                "unknown indexing strategy: {}",
                s
            ))),
        }
    }
}

// =============================================================================
// TARGET
// =============================================================================

/// Selects a subset of the store by schema and type name.
///
/// An empty set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingTarget {
    /// Accepted schemas.
    #[serde(default)]
    pub schemas: BTreeSet<String>,
    /// Accepted type names.
    #[serde(default)]
    pub types: BTreeSet<String>,
}

impl IndexingTarget {
    /// Matches every entry.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether `entry` falls inside the target.
    #[must_use]
    pub fn matches(&self, entry: &StorageEntry) -> bool {
        (self.schemas.is_empty() || self.schemas.contains(entry.schema()))
            && (self.types.is_empty() || self.types.contains(entry.type_name()))
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Population policy.
    pub strategy: IndexingStrategy,
    /// Worker threads for bulk passes.
    pub workers: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            strategy: IndexingStrategy::default(),
            workers: default_workers(),
        }
    }
}

impl IndexSettings {
    /// Build the worker pool; rejects a zero worker count.
    pub fn pool(&self) -> Result<WorkerPool, RefgraphError> {
        WorkerPool::new(self.workers)
    }
}

// =============================================================================
// TESTS
// =============================================================================
