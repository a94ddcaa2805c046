//! # Reference Flattening
//!
//! Turns arbitrary nested content into a flat list of `(path, scalar)` pairs
//! and filters that list down to reference candidates.
//!
//! - Map keys extend the path with a key segment.
//! - List elements extend the path with their index.
//! - `null` becomes [`NULL_SENTINEL`], so the path survives but never parses
//!   as a URI.
//! - The top-level [`OWN_PROPERTY`] is skipped entirely.

use crate::primitives::{NULL_SENTINEL, OWN_PROPERTY};
use crate::property::{PropertyPath, Segment, UriProperty};
use crate::uri::StorageUri;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Flatten an object body into `(path, scalar)` pairs, in document order.
#[must_use]
pub fn flatten(body: &Map<String, Value>) -> Vec<(PropertyPath, Value)> {
    let mut out = Vec::new();
    for (key, value) in body {
        if key == OWN_PROPERTY {
            continue;
        }
        descend(PropertyPath::root().join(Segment::key(key.as_str())), value, &mut out);
    }
    out
}

// Explicit worklist keeps deep documents off the call stack.
fn descend(path: PropertyPath, value: &Value, out: &mut Vec<(PropertyPath, Value)>) {
    let mut stack = vec![(path, value)];
    let mut emitted = Vec::new();
    while let Some((path, value)) = stack.pop() {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter().rev() {
                    stack.push((path.join(Segment::key(key.as_str())), child));
                }
            }
            Value::Array(items) => {
                for (idx, child) in items.iter().enumerate().rev() {
                    stack.push((path.join(Segment::Idx(idx)), child));
                }
            }
            Value::Null => emitted.push((path, Value::String(NULL_SENTINEL.to_string()))),
            scalar => emitted.push((path, scalar.clone())),
        }
    }
    out.extend(emitted);
}

/// Reference candidates of an object body.
///
/// Every flattened value that parses as a store URI becomes a
/// [`UriProperty`]; the rest is dropped.
#[must_use]
pub fn uri_properties(body: &Map<String, Value>) -> BTreeSet<UriProperty> {
    flatten(body)
        .into_iter()
        .filter_map(|(path, value)| {
            StorageUri::from_value(&value).map(|uri| UriProperty::new(path, uri))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
