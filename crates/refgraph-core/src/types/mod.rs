//! # Core Type Definitions
//!
//! This module contains the small shared types of the crate:
//! - Storage identity (`StorageId`)
//! - Entry classification (`EntryKind`)
//! - Raw driver payloads (`RawContent`)
//! - Error types (`RefgraphError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// STORAGE IDENTITY
// =============================================================================

/// Identifier of one storage instance.
///
/// An index is created per storage instance; the id only labels log output
/// and snapshots, it never takes part in entry identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StorageId(pub String);

impl StorageId {
    /// Create a new storage id.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ENTRY KIND
// =============================================================================

/// The closed set of entry variants.
///
/// Scoping is orthogonal: Object, List and Map entries may be scoped to a
/// host object, Sequences never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A structured record.
    Object,
    /// A stored list of URIs.
    List,
    /// A stored map of keys to URIs.
    Map,
    /// A stored counter.
    Sequence,
}

impl EntryKind {
    /// Human-readable variant name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::List => "List",
            Self::Map => "Map",
            Self::Sequence => "Sequence",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// RAW CONTENT
// =============================================================================

/// One record as handed over by a storage driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    /// Version of the record, when the store versions it.
    pub version: Option<u64>,
    /// The parsed record.
    pub body: serde_json::Value,
}

impl RawContent {
    /// Create unversioned content.
    #[must_use]
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            version: None,
            body,
        }
    }

    /// Create content at a given version.
    #[must_use]
    pub fn versioned(version: u64, body: serde_json::Value) -> Self {
        Self {
            version: Some(version),
            body,
        }
    }

    /// The body as an object map, if it is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.body.as_object()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in refgraph.
///
/// Only collaborators and constructors return these. The index, the graph
/// engine and the evaluator report business outcomes through their return
/// enums instead.
#[derive(Debug, Error)]
pub enum RefgraphError {
    /// The string is not a store URI.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// The URI is well-formed but maps to no entry variant.
    #[error("Unknown entry type: {0}")]
    UnknownEntryType(String),

    /// The driver could not produce content for a URI.
    #[error("Failed to load [ {uri} ]: {reason}")]
    LoadFailed {
        /// The URI being loaded.
        uri: String,
        /// Driver-supplied reason.
        reason: String,
    },

    /// An object-only operation was asked of another variant.
    #[error("Not an object entry: {0}")]
    NotAnObject(String),

    /// Content could not be parsed.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration could not be read or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A precondition on an API argument was violated.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RefgraphError {
    /// Shorthand for [`RefgraphError::LoadFailed`].
    pub fn load_failed(uri: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::LoadFailed {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_display() {
        assert_eq!(EntryKind::Object.to_string(), "Object");
        assert_eq!(EntryKind::Sequence.to_string(), "Sequence");
    }

    #[test]
    fn entry_kind_serde_is_snake_case() {
        let json = serde_json::to_string(&EntryKind::List).expect("serialize");
        assert_eq!(json, "\"list\"");
    }

    #[test]
    fn load_failed_message() {
        let err = RefgraphError::load_failed("s:/a/b", "gone");
        assert_eq!(err.to_string(), "Failed to load [ s:/a/b ]: gone");
    }

    #[test]
    fn raw_content_object_access() {
        let content = RawContent::new(serde_json::json!({"a": 1}));
        assert!(content.as_object().is_some());
        assert!(RawContent::new(serde_json::json!([1])).as_object().is_none());
    }
}
