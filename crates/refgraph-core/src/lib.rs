//! # refgraph-core
//!
//! An in-memory index over a URI-addressed object store, and the engines
//! that work on it: reference discovery, graph expansion and property
//! assertions.
//!
//! ## Layers
//!
//! - `uri`, `property`, `flatten`: addressing and reference extraction
//! - `entry`, `factory`: the cached projection of one store record
//! - `strategy`, `index`: population and acquisition
//! - `containment`, `graph`: bidirectional graph discovery
//! - `assertion`: yes/no questions over resolved properties
//!
//! ## Architectural Constraints
//!
//! - The store is reached only through the [`StorageDriver`] traits
//! - The index cache is the only shared mutable structure; graphs and
//!   lookup tables belong to the caller
//! - No async, no network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod assertion;
pub mod containment;
pub mod driver;
pub mod entry;
pub mod factory;
pub mod flatten;
pub mod graph;
pub mod index;
pub mod pool;
pub mod primitives;
pub mod property;
pub mod strategy;
pub mod types;
pub mod uri;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{EntryKind, RawContent, RefgraphError, StorageId};
pub use uri::StorageUri;
pub use property::{PropertyPath, Segment, UriProperty};

// =============================================================================
// RE-EXPORTS: Index
// =============================================================================

pub use driver::{CollectionAccessor, ContentLoader, MemoryStore, StorageDriver, UriEnumerator};
pub use entry::{EntryContent, StorageEntry};
pub use factory::EntryFactory;
pub use index::{Acquisition, EntryEvent, EventSink, StorageIndex};
pub use pool::WorkerPool;
pub use strategy::{IndexSettings, IndexingStrategy, IndexingTarget};

// =============================================================================
// RE-EXPORTS: Graph Discovery
// =============================================================================

pub use containment::ContainmentPredicate;
pub use graph::{
    DiscoveredGraph, EdgeSnapshot, Expansion, GraphEdge, GraphNode, GraphRenderer, GraphSettings,
    GraphSnapshot, NodeSnapshot, NodeStyle,
};

// =============================================================================
// RE-EXPORTS: Assertions
// =============================================================================

pub use assertion::{
    Assertion, Clause, Condition, Evaluator, Examiner, LookupTable, Operation, PropertyValue,
    QuerySpec,
};
