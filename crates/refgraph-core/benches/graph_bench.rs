//! # Graph Benchmarks
//!
//! Performance benchmarks for population, discovery and search.
//!
//! Run with: `cargo bench -p refgraph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use refgraph_core::{
    ContainmentPredicate, DiscoveredGraph, GraphRenderer, GraphSettings, IndexingStrategy,
    MemoryStore, StorageId, StorageIndex, StorageUri, WorkerPool,
};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn node(i: usize) -> String {
    format!("docs:/org_example_Node/n{}", i)
}

/// A store with N objects referencing their successor.
fn create_linear_store(size: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for i in 0..size {
        let body = if i + 1 < size {
            json!({ "next": node(i + 1) })
        } else {
            json!({})
        };
        store.put(&node(i), body).expect("put");
    }
    store
}

/// A store where a hub object references N spokes, each referencing the hub back.
fn create_star_store(size: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let spokes: Vec<String> = (1..size).map(node).collect();
    store.put(&node(0), json!({ "spokes": spokes })).expect("put");
    for i in 1..size {
        store.put(&node(i), json!({ "hub": node(0) })).expect("put");
    }
    store
}

fn open(store: &Arc<MemoryStore>, strategy: IndexingStrategy) -> StorageIndex {
    let index = StorageIndex::new(
        StorageId::new("bench"),
        store.clone(),
        WorkerPool::with_available_parallelism(),
    );
    index.refresh(strategy).expect("refresh");
    index
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_population(c: &mut Criterion) {
    let mut group = c.benchmark_group("population");

    for size in [100, 1000].iter() {
        let store = create_linear_store(*size);
        for strategy in [IndexingStrategy::Initial, IndexingStrategy::Full] {
            group.bench_with_input(
                BenchmarkId::new(strategy.to_string(), size),
                size,
                |b, _| {
                    b.iter(|| black_box(open(&store, strategy).len()));
                },
            );
        }
    }

    group.finish();
}

fn bench_outgoing(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_outgoing");

    for size in [100, 500].iter() {
        let store = create_linear_store(*size);
        let index = open(&store, IndexingStrategy::Full);
        let seed = index
            .discover(&StorageUri::parse(&node(0)).expect("uri"))
            .expect("seed");
        let renderer = GraphRenderer::new(&index, GraphSettings::default()).expect("renderer");
        let all = ContainmentPredicate::accept_all();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut graph = DiscoveredGraph::new();
                renderer.render_outgoing(&mut graph, &seed, &all);
                black_box(graph.edge_count())
            });
        });
    }

    group.finish();
}

fn bench_incoming(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_incoming");

    for size in [100, 500].iter() {
        let store = create_star_store(*size);
        let index = open(&store, IndexingStrategy::Full);
        let hub = index
            .discover(&StorageUri::parse(&node(0)).expect("uri"))
            .expect("hub");
        let renderer = GraphRenderer::new(&index, GraphSettings::default()).expect("renderer");
        let all = ContainmentPredicate::accept_all();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut graph = DiscoveredGraph::new();
                renderer.expand_incoming(&mut graph, &hub, &all, Some(1));
                black_box(graph.node_count())
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in [1000, 5000].iter() {
        let store = create_linear_store(*size);
        let index = open(&store, IndexingStrategy::Initial);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(index.search("Nod/n99").map(|found| found.len())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_population,
    bench_outgoing,
    bench_incoming,
    bench_search
);
criterion_main!(benches);
