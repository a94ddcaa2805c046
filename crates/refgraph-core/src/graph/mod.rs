//! # Graph Discovery Engine
//!
//! Builds a [`DiscoveredGraph`] around a seed entry by walking references
//! outward (what the seed points to) and inward (what points to the seed).
//!
//! - `settings`: round limits and the node filter
//! - `discovered`: the caller-owned node/edge accumulator
//! - `outgoing` / `incoming`: per-round discovery steps
//! - `render`: the fixpoint loops

mod discovered;
mod incoming;
mod outgoing;
mod render;
mod settings;

pub use discovered::{
    DiscoveredGraph, EdgeSnapshot, GraphEdge, GraphNode, GraphSnapshot, NodeSnapshot, NodeStyle,
};
pub use render::{Expansion, GraphRenderer};
pub use settings::GraphSettings;
