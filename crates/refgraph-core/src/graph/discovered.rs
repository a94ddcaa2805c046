//! # Discovered Graph
//!
//! The caller-owned accumulator of a traversal. Nodes are keyed by
//! canonical URI string, edges by the ordered pair of node keys; an edge
//! carries every property that justifies it.

use crate::entry::StorageEntry;
use crate::property::{UriProperty, edge_label};
use crate::uri::StorageUri;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Display class of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStyle {
    /// The seed of the traversal.
    Origin,
    /// The currently selected node.
    Highlighted,
    /// The seed, currently selected.
    OriginHighlighted,
}

impl NodeStyle {
    fn is_origin(self) -> bool {
        matches!(self, Self::Origin | Self::OriginHighlighted)
    }
}

/// One node of a discovered graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The entry behind the node.
    pub entry: Arc<StorageEntry>,
    /// Display class.
    pub style: Option<NodeStyle>,
}

/// One directed edge of a discovered graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    /// Referring node.
    pub from: StorageUri,
    /// Referenced node.
    pub to: StorageUri,
    /// Properties justifying the edge.
    pub properties: BTreeSet<UriProperty>,
}

impl GraphEdge {
    /// Property labels joined with ` | `, trimmed.
    #[must_use]
    pub fn label(&self) -> String {
        edge_label(&self.properties)
    }

    /// Number of justifying properties.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.properties.len()
    }

    /// Whether the edge only stems from collection elements.
    #[must_use]
    pub fn is_list_ref(&self) -> bool {
        !self.properties.iter().any(UriProperty::is_standalone)
    }
}

/// Accumulated nodes and edges of one or more traversals.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: BTreeMap<(String, String), GraphEdge>,
}

fn key(uri: &StorageUri) -> String {
    uri.canonical().to_string()
}

impl DiscoveredGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether a node exists for `uri` (ignoring version).
    #[must_use]
    pub fn contains_node(&self, uri: &StorageUri) -> bool {
        self.nodes.contains_key(&key(uri))
    }

    /// The node for `uri`.
    #[must_use]
    pub fn node(&self, uri: &StorageUri) -> Option<&GraphNode> {
        self.nodes.get(&key(uri))
    }

    /// The edge `from -> to`.
    #[must_use]
    pub fn edge(&self, from: &StorageUri, to: &StorageUri) -> Option<&GraphEdge> {
        self.edges.get(&(key(from), key(to)))
    }

    /// Whether there is no edge `from -> to` yet.
    #[must_use]
    pub fn edge_missing(&self, from: &StorageUri, to: &StorageUri) -> bool {
        self.edge(from, to).is_none()
    }

    /// Nodes, ordered by key.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Edges, ordered by `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    /// Add a node unless present. Returns whether it was added.
    pub fn add_node(&mut self, entry: &Arc<StorageEntry>) -> bool {
        let k = key(entry.uri());
        if self.nodes.contains_key(&k) {
            return false;
        }
        self.nodes.insert(
            k,
            GraphNode {
                entry: Arc::clone(entry),
                style: None,
            },
        );
        true
    }

    /// Add `entry` as the traversal origin, marking an existing node too.
    pub fn add_origin(&mut self, entry: &Arc<StorageEntry>) {
        self.add_node(entry);
        if let Some(node) = self.nodes.get_mut(&key(entry.uri())) {
            node.style = Some(match node.style {
                Some(NodeStyle::Highlighted | NodeStyle::OriginHighlighted) => {
                    NodeStyle::OriginHighlighted
                }
                _ => NodeStyle::Origin,
            });
        }
    }

    /// Add the edge `from -> to`, adding missing endpoint nodes.
    ///
    /// Returns `false` and changes nothing if the edge already exists.
    pub fn add_edge(
        &mut self,
        from: &Arc<StorageEntry>,
        to: &Arc<StorageEntry>,
        properties: BTreeSet<UriProperty>,
    ) -> bool {
        let k = (key(from.uri()), key(to.uri()));
        if self.edges.contains_key(&k) {
            return false;
        }
        self.add_node(from);
        self.add_node(to);
        self.edges.insert(
            k,
            GraphEdge {
                from: from.uri().clone(),
                to: to.uri().clone(),
                properties,
            },
        );
        true
    }

    /// Move the highlight from `from` to `to`, keeping origin markers.
    pub fn change_highlight(&mut self, from: Option<&StorageUri>, to: &StorageUri) {
        if let Some(node) = from.and_then(|uri| self.nodes.get_mut(&key(uri))) {
            node.style = node
                .style
                .filter(|s| s.is_origin())
                .map(|_| NodeStyle::Origin);
        }
        if let Some(node) = self.nodes.get_mut(&key(to)) {
            node.style = Some(match node.style {
                Some(s) if s.is_origin() => NodeStyle::OriginHighlighted,
                _ => NodeStyle::Highlighted,
            });
        }
    }

    /// Serializable summary of the graph.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .values()
                .map(|n| NodeSnapshot {
                    uri: n.entry.uri().to_string(),
                    label: n.entry.label(),
                    schema: n.entry.schema().to_string(),
                    type_name: n.entry.type_name().to_string(),
                    style: n.style,
                })
                .collect(),
            edges: self
                .edges
                .values()
                .map(|e| EdgeSnapshot {
                    from: e.from.to_string(),
                    to: e.to.to_string(),
                    label: e.label(),
                    weight: e.weight(),
                    list_ref: e.is_list_ref(),
                })
                .collect(),
        }
    }
}

/// Node part of a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Canonical URI.
    pub uri: String,
    /// Display label.
    pub label: String,
    /// Storage schema.
    pub schema: String,
    /// Type name.
    pub type_name: String,
    /// Display class.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub style: Option<NodeStyle>,
}

/// Edge part of a [`GraphSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// Referring node URI.
    pub from: String,
    /// Referenced node URI.
    pub to: String,
    /// Edge label.
    pub label: String,
    /// Number of justifying properties.
    pub weight: usize,
    /// Whether only collection elements justify the edge.
    pub list_ref: bool,
}

/// Plain-data view of a [`DiscoveredGraph`] for adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes, ordered by URI.
    pub nodes: Vec<NodeSnapshot>,
    /// Edges, ordered by `(from, to)`.
    pub edges: Vec<EdgeSnapshot>,
}
