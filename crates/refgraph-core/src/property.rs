//! # URI Properties
//!
//! A [`UriProperty`] is one outgoing reference discovered on an entry: the
//! property path it was found at, and the URI it names.
//!
//! Paths are sequences of [`Segment`]s rendered as dotted strings
//! (`data.items.2`). A property whose path contains a list index is
//! *positional*; all others are *standalone*.

use crate::primitives::EDGE_LABEL_LIMIT;
use crate::uri::StorageUri;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// SEGMENTS & PATHS
// =============================================================================

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// A list index.
    Idx(usize),
    /// A map key.
    Key(String),
}

impl Segment {
    /// Key segment helper.
    #[must_use]
    pub fn key(s: impl Into<String>) -> Self {
        Self::Key(s.into())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idx(i) => write!(f, "{}", i),
            Self::Key(k) => f.write_str(k),
        }
    }
}

// Indices sort before keys.
impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Idx(a), Self::Idx(b)) => a.cmp(b),
            (Self::Idx(_), Self::Key(_)) => Ordering::Less,
            (Self::Key(_), Self::Idx(_)) => Ordering::Greater,
            (Self::Key(a), Self::Key(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A dotted/indexed property path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyPath(Vec<Segment>);

impl PropertyPath {
    /// The empty (root) path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path; purely numeric parts become indices.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Self::root();
        }
        Self(
            s.split('.')
                .map(|part| match part.parse::<usize>() {
                    Ok(i) => Segment::Idx(i),
                    Err(_) => Segment::Key(part.to_string()),
                })
                .collect(),
        )
    }

    /// A new path with `segment` appended.
    #[must_use]
    pub fn join(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// The segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the path is exactly the single key `name`.
    #[must_use]
    pub fn is_single_key(&self, name: &str) -> bool {
        matches!(self.0.as_slice(), [Segment::Key(k)] if k == name)
    }

    /// The last list index on the path, if any.
    #[must_use]
    pub fn last_index(&self) -> Option<usize> {
        self.0.iter().rev().find_map(|s| match s {
            Segment::Idx(i) => Some(*i),
            Segment::Key(_) => None,
        })
    }

    /// The segments after the first `n`, rendered as a dotted string.
    #[must_use]
    pub fn suffix_from(&self, n: usize) -> String {
        self.0
            .iter()
            .skip(n)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The path without its first `n` segments.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        Self(self.0.iter().skip(n).cloned().collect())
    }

    /// Whether `self` is a segment-wise prefix of `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.suffix_from(0))
    }
}

impl From<Vec<Segment>> for PropertyPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

// =============================================================================
// URI PROPERTY
// =============================================================================

/// One discovered outgoing reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriProperty {
    /// Where the reference was found.
    pub path: PropertyPath,
    /// The referenced URI.
    pub uri: StorageUri,
    /// List position, for references found inside a list.
    pub position: Option<usize>,
}

impl UriProperty {
    /// Create a property; the position is derived from the path.
    #[must_use]
    pub fn new(path: PropertyPath, uri: StorageUri) -> Self {
        let position = path.last_index();
        Self {
            path,
            uri,
            position,
        }
    }

    /// A direct, single-key reference.
    #[must_use]
    pub fn standalone(name: impl Into<String>, uri: StorageUri) -> Self {
        Self {
            path: PropertyPath::from(vec![Segment::Key(name.into())]),
            uri,
            position: None,
        }
    }

    /// Whether this is a direct field reference rather than a list element.
    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.position.is_none()
    }

    /// Edge label: the path, or `prefix (position)` for list elements.
    #[must_use]
    pub fn label(&self) -> String {
        match self.position {
            None => self.path.to_string(),
            Some(position) => {
                let segments = self.path.segments();
                let prefix = match segments.last() {
                    Some(Segment::Idx(_)) => {
                        PropertyPath::from(segments[..segments.len() - 1].to_vec())
                    }
                    _ => self.path.clone(),
                };
                if prefix.is_empty() {
                    return format!("({})", position);
                }
                format!("{} ({})", prefix, position)
            }
        }
    }
}

impl Ord for UriProperty {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .cmp(&other.path)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialOrd for UriProperty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for UriProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.path, self.uri)
    }
}

/// Join property labels with ` | `, trimmed for edge display.
#[must_use]
pub fn edge_label<'a>(properties: impl IntoIterator<Item = &'a UriProperty>) -> String {
    let joined = properties
        .into_iter()
        .map(UriProperty::label)
        .collect::<Vec<_>>()
        .join(" | ");
    if joined.chars().count() <= EDGE_LABEL_LIMIT {
        return joined;
    }
    let mut trimmed: String = joined.chars().take(EDGE_LABEL_LIMIT).collect();
    trimmed.push_str("...");
    trimmed
}

// =============================================================================
// TESTS
// =============================================================================
