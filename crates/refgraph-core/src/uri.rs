//! # URI Utilities
//!
//! Store URIs have the shape `scheme:/path[.v<version>]`.
//!
//! - The scheme names the storage schema (the category of the entry).
//! - The path carries the type and the identifier, optionally a scope.
//! - The version suffix pins a point-in-time form of the same entry.
//!
//! Identity is always the version-stripped ("canonical") form. Versioned
//! forms exist only to address historical content.

use crate::primitives::{SINGLE_VERSION_SUFFIX, VERSION_PREFIX};
use crate::RefgraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters that never occur in a store URI.
const FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '\\', '^', '`'];

/// A parsed store URI.
///
/// Equality is exact (version included). Use [`StorageUri::canonical`] or
/// [`StorageUri::equal_ignoring_version`] for identity comparisons.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageUri {
    scheme: String,
    path: String,
    version: Option<u64>,
}

impl StorageUri {
    /// Parse a store URI.
    ///
    /// Rejects anything without a non-empty scheme and a non-empty path.
    pub fn parse(s: &str) -> Result<Self, RefgraphError> {
        let invalid = || RefgraphError::InvalidUri(s.to_string());

        if s.len() < 4 || s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid());
        }
        if s.contains(FORBIDDEN) {
            return Err(invalid());
        }
        if s.ends_with('.') || s.ends_with(VERSION_PREFIX) {
            return Err(invalid());
        }

        let idx = s.find(":/").ok_or_else(invalid)?;
        let scheme = &s[..idx];
        if !is_valid_scheme(scheme) {
            return Err(invalid());
        }

        let full_path = &s[idx + 1..];
        if full_path.len() < 2 {
            return Err(invalid());
        }

        let (path, version) = split_version(full_path);
        if path.len() < 2 {
            return Err(invalid());
        }

        Ok(Self {
            scheme: scheme.to_string(),
            path: path.to_string(),
            version,
        })
    }

    /// Parse a flattened value as a URI candidate.
    ///
    /// Only strings qualify; everything else is dropped.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        value.as_str().and_then(|s| Self::parse(s).ok())
    }

    /// The scheme (storage schema).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The path, without the version suffix.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The version, when the URI pins one.
    #[must_use]
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// The version-stripped identity form.
    #[must_use]
    pub fn canonical(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            path: self.path.clone(),
            version: None,
        }
    }

    /// Whether this URI carries no version suffix.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.version.is_none()
    }

    /// The point-in-time form at `version`.
    #[must_use]
    pub fn at_version(&self, version: u64) -> Self {
        Self {
            scheme: self.scheme.clone(),
            path: self.path.clone(),
            version: Some(version),
        }
    }

    /// Identity comparison: equal after stripping versions.
    #[must_use]
    pub fn equal_ignoring_version(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.path == other.path
    }

    /// Type name of an object URI.
    ///
    /// The last `_`-separated token of the first path segment, so
    /// `/org_example_Document/...` yields `Document`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.segments()
            .next()
            .and_then(|first| first.rsplit('_').next())
            .unwrap_or_default()
    }

    /// The identifier: the last path segment.
    #[must_use]
    pub fn uuid(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Name of a stored collection: the last segment minus the single-version suffix.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        let last = self.uuid();
        last.strip_suffix(SINGLE_VERSION_SUFFIX).unwrap_or(last)
    }

    /// Whether the entry is stored in a single, unversioned slot.
    #[must_use]
    pub fn is_single_version(&self) -> bool {
        self.path.ends_with(SINGLE_VERSION_SUFFIX)
    }

    /// Whether the canonical form contains a path marker.
    #[must_use]
    pub fn contains_marker(&self, marker: &str) -> bool {
        self.path.contains(marker)
    }

    /// The host URI preceding `marker`, for scoped entries.
    ///
    /// `None` when the marker is absent, starts the path, or the prefix is not
    /// itself a URI.
    #[must_use]
    pub fn host_before(&self, marker: &str) -> Option<Self> {
        let idx = self.path.find(marker)?;
        if idx == 0 {
            return None;
        }
        let host = format!("{}:{}", self.scheme, &self.path[..idx]);
        Self::parse(&host).ok()
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
}

fn split_version(path: &str) -> (&str, Option<u64>) {
    if let Some((head, tail)) = path.rsplit_once(VERSION_PREFIX) {
        if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(version) = tail.parse::<u64>() {
                return (head, Some(version));
            }
        }
    }
    (path, None)
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.path)?;
        if let Some(v) = self.version {
            write!(f, "{}{}", VERSION_PREFIX, v)?;
        }
        Ok(())
    }
}

impl FromStr for StorageUri {
    type Err = RefgraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StorageUri {
    type Error = RefgraphError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<StorageUri> for String {
    fn from(uri: StorageUri) -> Self {
        uri.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================
