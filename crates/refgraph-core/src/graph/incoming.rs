//! Reverse edge discovery.
//!
//! The store only knows forward references, so referrers are found by
//! scanning every cached entry's reference set.

use super::discovered::DiscoveredGraph;
use crate::entry::StorageEntry;
use crate::index::{StorageIndex, referrers_within};
use std::sync::Arc;

/// Referrers of every frontier member that pass `accept` and are not yet
/// connected to it.
///
/// The index is loaded in bulk once, then scanned per member on the pool.
pub(crate) fn referrers_of<F>(
    index: &StorageIndex,
    graph: &DiscoveredGraph,
    frontier: &[Arc<StorageEntry>],
    accept: F,
) -> Vec<Vec<Arc<StorageEntry>>>
where
    F: Fn(&StorageEntry) -> bool + Sync,
{
    let all = index.entities();
    index.validate(&all);
    index
        .pool()
        .map(frontier, |target| {
            referrers_within(&all, target.uri())
                .into_iter()
                .filter(|r| accept(r.as_ref()))
                .filter(|r| graph.edge_missing(r.uri(), target.uri()))
                .collect::<Vec<_>>()
        })
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect()
}
