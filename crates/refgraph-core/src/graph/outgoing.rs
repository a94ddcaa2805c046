//! Forward edge discovery.

use super::discovered::DiscoveredGraph;
use crate::entry::StorageEntry;
use crate::index::StorageIndex;
use crate::property::UriProperty;
use crate::uri::StorageUri;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Targets of one entry with the properties pointing at each, ordered by URI.
pub(crate) type Connections = Vec<(Arc<StorageEntry>, BTreeSet<UriProperty>)>;

/// Group the references of `entry` by target entry.
///
/// Targets are resolved through [`StorageIndex::discover`]; unresolvable
/// ones, targets failing `accept`, and targets already connected from
/// `entry` are left out.
pub(crate) fn find_connections<F>(
    index: &StorageIndex,
    graph: &DiscoveredGraph,
    entry: &StorageEntry,
    accept: F,
) -> Connections
where
    F: Fn(&StorageEntry) -> bool,
{
    let mut grouped: BTreeMap<StorageUri, (Arc<StorageEntry>, BTreeSet<UriProperty>)> =
        BTreeMap::new();
    for property in entry.uri_properties() {
        let Some(target) = index.discover(&property.uri) else {
            continue;
        };
        if !accept(target.as_ref()) || !graph.edge_missing(entry.uri(), target.uri()) {
            continue;
        }
        grouped
            .entry(target.uri().clone())
            .or_insert_with(|| (Arc::clone(&target), BTreeSet::new()))
            .1
            .insert(property);
    }
    grouped.into_values().collect()
}

/// Connections of every frontier member, computed on the index's pool.
pub(crate) fn connections_of<F>(
    index: &StorageIndex,
    graph: &DiscoveredGraph,
    frontier: &[Arc<StorageEntry>],
    accept: F,
) -> Vec<Connections>
where
    F: Fn(&StorageEntry) -> bool + Sync,
{
    index
        .pool()
        .map(frontier, |entry| find_connections(index, graph, entry, &accept))
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryStore;
    use crate::pool::WorkerPool;
    use crate::types::StorageId;
    use serde_json::json;

    #[test]
    fn groups_properties_by_target() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                "docs:/org_example_Doc/a",
                json!({
                    "owner": "docs:/org_example_Person/p",
                    "reviewer": "docs:/org_example_Person/p.v2",
                    "bogus": "docs:/storedRef/nowhere"
                }),
            )
            .expect("put");
        let index = StorageIndex::new(StorageId::new("t"), store, WorkerPool::serial());
        let a = index
            .discover(&StorageUri::parse("docs:/org_example_Doc/a").expect("uri"))
            .expect("a");
        let graph = DiscoveredGraph::new();
        let conns = find_connections(&index, &graph, &a, |_| true);
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].1.len(), 2);
        assert!(find_connections(&index, &graph, &a, |_| false).is_empty());
    }
}
