//! # Assertions
//!
//! An [`Assertion`] pairs a property path with an [`Operation`]; testing
//! it against a resolved [`PropertyValue`] yields a boolean.
//!
//! Equality is type-aware: the expected JSON value picks the kind of
//! result it can match, and `null` matches only [`PropertyValue::NoValue`].

use super::examiner::PropertyValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// A test applied to a resolved property.
///
/// Serialized externally tagged: `{"is": "draft"}`, `{"in": [1, 2]}`,
/// `"is_present"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Equal to the expected value.
    Is(Value),
    /// Not equal to the expected value.
    Not(Value),
    /// Equal to any of the expected values. An empty set never matches.
    In(Vec<Value>),
    /// Substring of a string; membership in a list (every element, for an
    /// array).
    Contains(Value),
    /// String prefix.
    StartsWith(String),
    /// String suffix.
    EndsWith(String),
    /// Some key of either map has equal values on both sides.
    Overlaps(Map<String, Value>),
    /// List length.
    HasSize(usize),
    /// Nothing found.
    IsEmpty,
    /// Something found.
    IsPresent,
}

impl Operation {
    /// Test `actual` against this operation.
    #[must_use]
    pub fn test(&self, actual: &PropertyValue) -> bool {
        match self {
            Self::Is(expected) => equals(actual, expected),
            Self::Not(expected) => !equals(actual, expected),
            Self::In(expected) => expected.iter().any(|e| equals(actual, e)),
            Self::Contains(expected) => contains(actual, expected),
            Self::StartsWith(prefix) => {
                matches!(actual, PropertyValue::StringFound(s) if s.starts_with(prefix.as_str()))
            }
            Self::EndsWith(suffix) => {
                matches!(actual, PropertyValue::StringFound(s) if s.ends_with(suffix.as_str()))
            }
            Self::Overlaps(expected) => {
                matches!(actual, PropertyValue::ComplexFound(map) if overlaps(map, expected))
            }
            Self::HasSize(n) => matches!(actual, PropertyValue::ListFound(items) if items.len() == *n),
            Self::IsEmpty => actual.is_none(),
            Self::IsPresent => !actual.is_none(),
        }
    }
}

/// A property path and the operation to test on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// Dotted property path.
    pub prop: String,
    /// The test.
    pub op: Operation,
}

impl Assertion {
    #[must_use]
    pub fn new(prop: impl Into<String>, op: Operation) -> Self {
        Self {
            prop: prop.into(),
            op,
        }
    }
}

fn equals(actual: &PropertyValue, expected: &Value) -> bool {
    match (actual, expected) {
        (PropertyValue::NoValue, Value::Null) => true,
        (PropertyValue::StringFound(a), Value::String(e)) => a == e,
        (PropertyValue::BooleanFound(a), Value::Bool(e)) => a == e,
        (PropertyValue::NumberFound(a), Value::Number(e)) => numbers_equal(a, e),
        (PropertyValue::ComplexFound(a), Value::Object(e)) => {
            a.len() == e.len() && a.iter().all(|(k, v)| e.get(k) == Some(v))
        }
        _ => false,
    }
}

fn holds(items: &[PropertyValue], wanted: &Value) -> bool {
    items.iter().any(|item| !item.is_none() && equals(item, wanted))
}

fn contains(actual: &PropertyValue, expected: &Value) -> bool {
    match (actual, expected) {
        (PropertyValue::StringFound(s), Value::String(needle)) => s.contains(needle.as_str()),
        (PropertyValue::ListFound(items), Value::Array(wanted)) => {
            wanted.iter().all(|w| holds(items, w))
        }
        (PropertyValue::ListFound(items), single) => holds(items, single),
        _ => false,
    }
}

/// Floating-point comparison when either side is a float, integer
/// comparison otherwise. No tolerance.
fn numbers_equal(actual: &Number, expected: &Number) -> bool {
    if actual.is_f64() || expected.is_f64() {
        return match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(e)) => a.total_cmp(&e) == Ordering::Equal,
            _ => false,
        };
    }
    match (actual.as_i64(), expected.as_i64()) {
        (Some(a), Some(e)) => a == e,
        _ => actual.as_u64().is_some() && actual.as_u64() == expected.as_u64(),
    }
}

// Scans the key union; a key missing on one side reads as null there.
fn overlaps(actual: &Map<String, Value>, expected: &Map<String, Value>) -> bool {
    actual
        .keys()
        .chain(expected.keys())
        .any(|k| actual.get(k).unwrap_or(&Value::Null) == expected.get(k).unwrap_or(&Value::Null))
}
