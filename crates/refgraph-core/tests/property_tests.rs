//! # Property-Based Tests
//!
//! Invariants of addressing, flattening and graph expansion under
//! generated inputs.

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use refgraph_core::{
    ContainmentPredicate, DiscoveredGraph, GraphRenderer, GraphSettings, IndexingStrategy,
    MemoryStore, StorageId, StorageIndex, StorageUri, WorkerPool, flatten,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;

fn node_uri(i: usize) -> String {
    format!("docs:/org_example_Node/n{}", i)
}

/// A store of `n` nodes where node `i` references every node in `edges[i]`.
fn graph_store(n: usize, edges: &[Vec<usize>]) -> StorageIndex {
    let store = Arc::new(MemoryStore::new());
    for i in 0..n {
        let refs: Vec<Value> = edges
            .get(i)
            .map(|targets| targets.iter().map(|t| json!(node_uri(t % n))).collect())
            .unwrap_or_default();
        store
            .put(&node_uri(i), json!({ "refs": refs }))
            .expect("put");
    }
    let index = StorageIndex::new(StorageId::new("prop"), store, WorkerPool::new(3).expect("pool"));
    index.refresh(IndexingStrategy::Initial).expect("refresh");
    index
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every version of a URI collapses onto the same canonical form.
    #[test]
    fn canonical_ignores_version(id in "[a-z]{1,8}", v1 in 0u64..1000, v2 in 0u64..1000) {
        let base = StorageUri::parse(&format!("docs:/org_example_Doc/{}", id)).expect("uri");
        let a = base.at_version(v1);
        let b = base.at_version(v2);
        prop_assert_eq!(a.canonical(), b.canonical());
        prop_assert!(a.equal_ignoring_version(&b));
        prop_assert_eq!(a.version(), Some(v1));
    }

    /// Flattening finds exactly the URI strings, positional inside lists.
    #[test]
    fn flatten_finds_every_reference(ids in btree_set("[a-z]{1,6}", 0..12), plain in vec("[A-Z ]{0,6}", 0..5)) {
        let listed: Vec<Value> = ids
            .iter()
            .map(|id| json!(format!("docs:/org_example_Item/{}", id)))
            .collect();
        let mut body = Map::new();
        body.insert("items".to_string(), Value::Array(listed));
        body.insert("notes".to_string(), json!(plain));
        let props = flatten::uri_properties(&body);
        prop_assert_eq!(props.len(), ids.len());
        prop_assert!(props.iter().all(|p| !p.is_standalone()));
    }

    /// Unbounded outgoing expansion reaches the same graph regardless of pool size,
    /// and every edge connects two known nodes.
    #[test]
    fn outgoing_expansion_is_deterministic(
        n in 2usize..12,
        edges in vec(vec(0usize..64, 0..4), 0..12),
    ) {
        let index = graph_store(n, &edges);
        let seed = index
            .discover(&StorageUri::parse(&node_uri(0)).expect("uri"))
            .expect("seed");
        let renderer = GraphRenderer::new(&index, GraphSettings::default()).expect("renderer");

        let mut first = DiscoveredGraph::new();
        renderer.render_outgoing(&mut first, &seed, &ContainmentPredicate::accept_all());
        let mut second = DiscoveredGraph::new();
        renderer.render_outgoing(&mut second, &seed, &ContainmentPredicate::accept_all());

        prop_assert_eq!(first.snapshot(), second.snapshot());
        prop_assert!(first.node_count() <= n);
        for edge in first.edges() {
            prop_assert!(first.contains_node(&edge.from));
            prop_assert!(first.contains_node(&edge.to));
        }
    }

    /// Bounded expansion never produces more than the unbounded one.
    #[test]
    fn limits_only_shrink_the_graph(
        n in 2usize..10,
        edges in vec(vec(0usize..64, 0..3), 0..10),
        limit in 0usize..4,
    ) {
        let index = graph_store(n, &edges);
        let seed = index
            .discover(&StorageUri::parse(&node_uri(0)).expect("uri"))
            .expect("seed");
        let renderer = GraphRenderer::new(&index, GraphSettings::default()).expect("renderer");
        let all = ContainmentPredicate::accept_all();

        let mut bounded = DiscoveredGraph::new();
        let stats = renderer.expand_outgoing(&mut bounded, &seed, &all, Some(limit));
        let mut full = DiscoveredGraph::new();
        renderer.render_outgoing(&mut full, &seed, &all);

        prop_assert!(stats.rounds <= limit);
        prop_assert!(bounded.node_count() <= full.node_count());
        prop_assert!(bounded.edge_count() <= full.edge_count());
    }
    /// Extraction is a pure function of the body.
    #[test]
    fn uri_properties_are_stable(ids in vec("[a-z]{1,6}", 0..8), nested in "[a-z]{1,6}") {
        let mut body = Map::new();
        for (i, id) in ids.iter().enumerate() {
            body.insert(format!("k{}", i), json!(format!("docs:/org_example_Item/{}", id)));
        }
        body.insert("inner".to_string(), json!({ "ref": format!("docs:/org_example_Item/{}", nested) }));
        let first = flatten::uri_properties(&body);
        let second = flatten::uri_properties(&body);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), ids.len() + 1);
    }

    /// A blacklist always wins over a whitelist naming the same type.
    #[test]
    fn blacklist_dominates_whitelist(
        allowed in btree_set("[A-Z][a-z]{0,5}", 1..5),
        denied in btree_set("[A-Z][a-z]{0,5}", 0..5),
        probe in "[A-Z][a-z]{0,5}",
    ) {
        let predicate = ContainmentPredicate::accept_all()
            .whitelist_types(allowed.iter().cloned())
            .blacklist_types(denied.iter().cloned());
        let expected = allowed.contains(&probe) && !denied.contains(&probe);
        prop_assert_eq!(predicate.test("docs", &probe), expected);
        prop_assert!(ContainmentPredicate::accept_all().test("docs", &probe));
    }
}
