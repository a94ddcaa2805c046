//! # Graph Rendering
//!
//! Fixpoint expansion of a [`DiscoveredGraph`] around a seed entry, driven
//! by explicit worklists.
//!
//! ## Outgoing
//!
//! Each round loads the frontier in bulk, resolves every member's
//! references on the pool, then adds the accepted edges. The next frontier
//! is the set of distinct targets of edges added in the round. Rejected
//! targets never become nodes, so nothing is expanded through them.
//!
//! ## Incoming
//!
//! Each round takes the current referrers, adds their edges towards nodes
//! already in the graph, then scans the index for referrers of those
//! referrers that are not yet connected to them.
//!
//! Both directions stop when a round adds nothing or the round limit is hit.

use super::discovered::DiscoveredGraph;
use super::settings::GraphSettings;
use super::{incoming, outgoing};
use crate::containment::ContainmentPredicate;
use crate::entry::StorageEntry;
use crate::index::StorageIndex;
use crate::uri::StorageUri;
use crate::RefgraphError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// What an expansion did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Rounds that ran.
    pub rounds: usize,
    /// Edges added.
    pub edges: usize,
}

/// Expands discovered graphs over one index.
#[derive(Debug)]
pub struct GraphRenderer<'a> {
    index: &'a StorageIndex,
    settings: GraphSettings,
}

impl<'a> GraphRenderer<'a> {
    /// A renderer with validated `settings`.
    pub fn new(index: &'a StorageIndex, settings: GraphSettings) -> Result<Self, RefgraphError> {
        settings.validate()?;
        Ok(Self { index, settings })
    }

    /// The active settings.
    #[must_use]
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// Add `seed` as origin and expand it as configured.
    ///
    /// A limit of `0` skips that direction.
    pub fn render(&self, graph: &mut DiscoveredGraph, seed: &Arc<StorageEntry>) -> Expansion {
        if !graph.contains_node(seed.uri()) {
            graph.add_origin(seed);
        }
        let predicate = &self.settings.containment;
        let mut total = Expansion::default();
        if self.settings.outbound_limit != 0 {
            let out = self.expand_outgoing(graph, seed, predicate, self.settings.outbound_rounds());
            total.rounds += out.rounds;
            total.edges += out.edges;
        }
        if self.settings.inbound_limit != 0 {
            let inc = self.expand_incoming(graph, seed, predicate, self.settings.inbound_rounds());
            total.rounds += inc.rounds;
            total.edges += inc.edges;
        }
        info!(
            seed = %seed.uri(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "rendered graph"
        );
        total
    }

    /// Forward expansion from `seed` to the fixpoint.
    pub fn render_outgoing(
        &self,
        graph: &mut DiscoveredGraph,
        seed: &Arc<StorageEntry>,
        predicate: &ContainmentPredicate,
    ) -> Expansion {
        self.expand_outgoing(graph, seed, predicate, None)
    }

    /// Reverse expansion towards `seed` to the fixpoint.
    pub fn render_incoming(
        &self,
        graph: &mut DiscoveredGraph,
        seed: &Arc<StorageEntry>,
        predicate: &ContainmentPredicate,
    ) -> Expansion {
        self.expand_incoming(graph, seed, predicate, None)
    }

    /// Forward expansion limited to `limit` rounds (`None`: unbounded).
    pub fn expand_outgoing(
        &self,
        graph: &mut DiscoveredGraph,
        seed: &Arc<StorageEntry>,
        predicate: &ContainmentPredicate,
        limit: Option<usize>,
    ) -> Expansion {
        if !graph.contains_node(seed.uri()) {
            graph.add_origin(seed);
        }
        let mut stats = Expansion::default();
        let mut frontier = vec![Arc::clone(seed)];
        while !frontier.is_empty() && limit.is_none_or(|l| stats.rounds < l) {
            self.index.validate(&frontier);
            let found = outgoing::connections_of(self.index, graph, &frontier, |target| {
                predicate.test_entry(target)
            });
            stats.rounds += 1;

            let mut next: BTreeMap<StorageUri, Arc<StorageEntry>> = BTreeMap::new();
            for (from, connections) in frontier.iter().zip(found) {
                for (to, properties) in connections {
                    if graph.add_edge(from, &to, properties) {
                        stats.edges += 1;
                        next.entry(to.uri().clone()).or_insert(to);
                    }
                }
            }
            debug!(
                round = stats.rounds,
                frontier = frontier.len(),
                next = next.len(),
                "outgoing round"
            );
            frontier = next.into_values().collect();
        }
        stats
    }

    /// Reverse expansion limited to `limit` rounds (`None`: unbounded).
    pub fn expand_incoming(
        &self,
        graph: &mut DiscoveredGraph,
        seed: &Arc<StorageEntry>,
        predicate: &ContainmentPredicate,
        limit: Option<usize>,
    ) -> Expansion {
        if !graph.contains_node(seed.uri()) {
            graph.add_origin(seed);
        }
        let accept = |entry: &StorageEntry| predicate.test_entry(entry);
        let mut stats = Expansion::default();
        let mut referrers = distinct(incoming::referrers_of(
            self.index,
            graph,
            std::slice::from_ref(seed),
            accept,
        ));
        while !referrers.is_empty() && limit.is_none_or(|l| stats.rounds < l) {
            self.index.validate(&referrers);
            let found = {
                let known: &DiscoveredGraph = graph;
                outgoing::connections_of(self.index, known, &referrers, |target| {
                    known.contains_node(target.uri())
                })
            };
            stats.rounds += 1;

            for (from, connections) in referrers.iter().zip(found) {
                for (to, properties) in connections {
                    if graph.add_edge(from, &to, properties) {
                        stats.edges += 1;
                    }
                }
            }
            let next = distinct(incoming::referrers_of(self.index, graph, &referrers, accept));
            debug!(
                round = stats.rounds,
                referrers = referrers.len(),
                next = next.len(),
                "incoming round"
            );
            referrers = next;
        }
        stats
    }
}

fn distinct(groups: Vec<Vec<Arc<StorageEntry>>>) -> Vec<Arc<StorageEntry>> {
    let mut seen: BTreeMap<StorageUri, Arc<StorageEntry>> = BTreeMap::new();
    for entry in groups.into_iter().flatten() {
        seen.entry(entry.uri().clone()).or_insert(entry);
    }
    seen.into_values().collect()
}
