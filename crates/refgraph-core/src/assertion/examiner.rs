//! # Property Examination
//!
//! Resolves a dotted property path on an entry to a [`PropertyValue`].
//!
//! Resolution order on an object entry, per stored version:
//!
//! 1. A reference whose path is a segment-wise prefix of the query: the
//!    rest of the query is resolved on the referenced entry.
//! 2. Positional references matched with their list indices treated as
//!    wildcards (`items.name` against `items.0`, `items.1`, ...): the rest
//!    is resolved on every referenced entry and gathered into a list.
//! 3. The entry's own content.
//!
//! A path that ends exactly on a reference yields [`PropertyValue::NoValue`]:
//! the referenced entry is reached but no property of it is named.
//!
//! Multi-version entries are tried newest first; the first result that is
//! not [`PropertyValue::NotFound`] wins.

use crate::entry::{EntryContent, StorageEntry};
use crate::index::StorageIndex;
use crate::property::{PropertyPath, Segment, UriProperty};
use crate::uri::StorageUri;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::fmt;

/// Result of resolving a property path.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// The path leads nowhere (missing key, `null`, index out of range).
    NoValue,
    /// Resolution failed.
    NotFound(String),
    /// A string.
    StringFound(String),
    /// A number.
    NumberFound(Number),
    /// A boolean.
    BooleanFound(bool),
    /// A JSON object.
    ComplexFound(Map<String, Value>),
    /// A list, either stored as such or gathered across list elements.
    ListFound(Vec<PropertyValue>),
}

impl PropertyValue {
    /// `NoValue` or `NotFound`.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::NoValue | Self::NotFound(_))
    }

    fn scalar(value: &Value) -> Self {
        match value {
            Value::Null => Self::NoValue,
            Value::Bool(b) => Self::BooleanFound(*b),
            Value::Number(n) => Self::NumberFound(n.clone()),
            Value::String(s) => Self::StringFound(s.clone()),
            Value::Array(items) => Self::ListFound(items.iter().map(Self::scalar).collect()),
            Value::Object(map) => Self::ComplexFound(map.clone()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoValue => f.write_str("<no value>"),
            Self::NotFound(reason) => write!(f, "<not found: {}>", reason),
            Self::StringFound(s) => write!(f, "\"{}\"", s),
            Self::NumberFound(n) => write!(f, "{}", n),
            Self::BooleanFound(b) => write!(f, "{}", b),
            Self::ComplexFound(map) => write!(f, "{}", Value::Object(map.clone())),
            Self::ListFound(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Entry loads made during one evaluation, keyed by canonical URI.
#[derive(Debug, Default)]
pub struct LookupTable {
    loaded: HashMap<StorageUri, Result<EntryContent, String>>,
}

impl LookupTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries loaded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// Whether nothing was loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    fn content(&mut self, entry: &StorageEntry) -> Result<EntryContent, String> {
        self.loaded
            .entry(entry.uri().clone())
            .or_insert_with(|| entry.load_content().map_err(|e| e.to_string()))
            .clone()
    }
}

// One resolution step: either a single value or values spread over list
// elements, which flatten into the enclosing gather.
enum Hit {
    One(PropertyValue),
    Spread(Vec<PropertyValue>),
}

impl Hit {
    fn into_value(self) -> PropertyValue {
        match self {
            Self::One(value) => value,
            Self::Spread(values) => PropertyValue::ListFound(values),
        }
    }

    fn is_not_found(&self) -> bool {
        matches!(self, Self::One(PropertyValue::NotFound(_)))
    }
}

fn gather(hits: impl IntoIterator<Item = Hit>) -> Hit {
    let mut values = Vec::new();
    for hit in hits {
        match hit {
            Hit::One(value) => values.push(value),
            Hit::Spread(more) => values.extend(more),
        }
    }
    Hit::Spread(values)
}

/// Resolves property paths against entries of one index.
#[derive(Debug, Clone, Copy)]
pub struct Examiner<'a> {
    index: &'a StorageIndex,
}

impl<'a> Examiner<'a> {
    #[must_use]
    pub fn new(index: &'a StorageIndex) -> Self {
        Self { index }
    }

    /// Resolve `query` on `entry` with a fresh lookup table.
    #[must_use]
    pub fn examine(&self, entry: &StorageEntry, query: &str) -> PropertyValue {
        self.examine_with(entry, query, &mut LookupTable::new())
    }

    /// Resolve `query` on `entry`, reusing loads recorded in `table`.
    pub fn examine_with(
        &self,
        entry: &StorageEntry,
        query: &str,
        table: &mut LookupTable,
    ) -> PropertyValue {
        self.resolve(entry, &PropertyPath::parse(query), table)
            .into_value()
    }

    fn resolve(&self, entry: &StorageEntry, query: &PropertyPath, table: &mut LookupTable) -> Hit {
        let content = match table.content(entry) {
            Ok(content) => content,
            Err(reason) => return Hit::One(PropertyValue::NotFound(reason)),
        };
        match content {
            EntryContent::Single(body) => self.in_version(entry, &body, query, table),
            EntryContent::Multi(versions) => versions
                .iter()
                .rev()
                .map(|version| self.in_version(entry, &version.body, query, table))
                .find(|hit| !hit.is_not_found())
                .unwrap_or(Hit::One(PropertyValue::NoValue)),
        }
    }

    fn in_version(
        &self,
        entry: &StorageEntry,
        body: &Value,
        query: &PropertyPath,
        table: &mut LookupTable,
    ) -> Hit {
        // A path naming a reference itself, or nothing at all, has no value.
        if query.is_empty() {
            return Hit::One(PropertyValue::NoValue);
        }
        let properties = entry.uri_properties();

        if let Some(property) = properties
            .iter()
            .find(|p| !p.path.is_empty() && p.path.is_prefix_of(query))
        {
            let rest = query.tail(property.path.len());
            return match self.index.discover(&property.uri) {
                Some(target) => self.resolve(&target, &rest, table),
                None => Hit::One(PropertyValue::NotFound(format!(
                    "{} is unreachable",
                    property.uri
                ))),
            };
        }

        let spread: Vec<(&UriProperty, usize)> = properties
            .iter()
            .filter(|p| !p.is_standalone())
            .filter_map(|p| wildcard_match(&p.path, query).map(|consumed| (p, consumed)))
            .collect();
        if !spread.is_empty() {
            let mut hits = Vec::with_capacity(spread.len());
            for (property, consumed) in spread {
                if let Some(target) = self.index.discover(&property.uri) {
                    let rest = query.tail(consumed);
                    hits.push(self.resolve(&target, &rest, table));
                }
            }
            return gather(hits);
        }

        walk(body, query.segments())
    }
}

/// Match `property` against the start of `query`, its list indices acting
/// as wildcards where the query names a key. Returns the number of query
/// segments consumed.
fn wildcard_match(property: &PropertyPath, query: &PropertyPath) -> Option<usize> {
    let wanted = query.segments();
    let mut consumed = 0;
    for segment in property.segments() {
        match (segment, wanted.get(consumed)) {
            (Segment::Idx(a), Some(Segment::Idx(b))) if a == b => consumed += 1,
            (Segment::Idx(_), Some(Segment::Idx(_))) => return None,
            (Segment::Idx(_), _) => {}
            (Segment::Key(a), Some(Segment::Key(b))) if a == b => consumed += 1,
            (Segment::Key(_), _) => return None,
        }
    }
    (consumed > 0).then_some(consumed)
}

fn walk(value: &Value, rest: &[Segment]) -> Hit {
    let Some((head, tail)) = rest.split_first() else {
        return Hit::One(PropertyValue::scalar(value));
    };
    match value {
        Value::Null => Hit::One(PropertyValue::NoValue),
        Value::Object(map) => {
            let key = match head {
                Segment::Key(k) => k.clone(),
                Segment::Idx(i) => i.to_string(),
            };
            match map.get(&key) {
                Some(next) => walk(next, tail),
                None => Hit::One(PropertyValue::NoValue),
            }
        }
        Value::Array(items) => match head {
            Segment::Idx(i) => match items.get(*i) {
                Some(next) => walk(next, tail),
                None => Hit::One(PropertyValue::NoValue),
            },
            Segment::Key(_) => gather(items.iter().map(|item| walk(item, rest))),
        },
        scalar => Hit::One(PropertyValue::NotFound(format!(
            "path continues at [{}] past the value {}",
            head, scalar
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryStore;
    use crate::pool::WorkerPool;
    use crate::types::StorageId;
    use serde_json::json;
    use std::sync::Arc;

    fn fixture() -> (Arc<MemoryStore>, StorageIndex) {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                "docs:/org_example_Doc/d1",
                json!({
                    "title": "Annual report",
                    "pages": 12,
                    "draft": false,
                    "meta": { "lang": "en", "tags": ["a", "b"] },
                    "owner": "docs:/org_example_Person/p1",
                    "reviewers": ["docs:/org_example_Person/p1", "docs:/org_example_Person/p2"],
                    "sections": [{ "name": "intro" }, { "name": "body" }]
                }),
            )
            .expect("put");
        store
            .put("docs:/org_example_Person/p1", json!({ "name": "Ada" }))
            .expect("put");
        store
            .put("docs:/org_example_Person/p2", json!({ "name": "Grace" }))
            .expect("put");
        let index = StorageIndex::new(StorageId::new("t"), store.clone(), WorkerPool::serial());
        (store, index)
    }

    fn doc(index: &StorageIndex) -> Arc<StorageEntry> {
        index
            .discover(&StorageUri::parse("docs:/org_example_Doc/d1").expect("uri"))
            .expect("doc")
    }

    #[test]
    fn resolves_own_content() {
        let (_store, index) = fixture();
        let ex = Examiner::new(&index);
        let d = doc(&index);
        assert_eq!(ex.examine(&d, "title"), PropertyValue::StringFound("Annual report".into()));
        assert_eq!(ex.examine(&d, "pages"), PropertyValue::NumberFound(12.into()));
        assert_eq!(ex.examine(&d, "draft"), PropertyValue::BooleanFound(false));
        assert_eq!(ex.examine(&d, "meta.lang"), PropertyValue::StringFound("en".into()));
        assert_eq!(ex.examine(&d, "meta.tags.1"), PropertyValue::StringFound("b".into()));
        assert_eq!(ex.examine(&d, "meta.tags.7"), PropertyValue::NoValue);
        assert_eq!(ex.examine(&d, "missing"), PropertyValue::NoValue);
        assert!(matches!(ex.examine(&d, "meta"), PropertyValue::ComplexFound(m) if m.len() == 2));
        // every stored version failed, which reads as no value
        assert_eq!(ex.examine(&d, "title.x"), PropertyValue::NoValue);
    }

    #[test]
    fn single_version_keeps_the_failure() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("docs:/org_example_Doc/d1-s", json!({ "title": "x" }))
            .expect("put");
        let index = StorageIndex::new(StorageId::new("t"), store, WorkerPool::serial());
        let d = index
            .discover(&StorageUri::parse("docs:/org_example_Doc/d1-s").expect("uri"))
            .expect("doc");
        let ex = Examiner::new(&index);
        assert_eq!(ex.examine(&d, "title"), PropertyValue::StringFound("x".into()));
        assert!(matches!(ex.examine(&d, "title.x"), PropertyValue::NotFound(_)));
    }

    #[test]
    fn multicasts_over_lists() {
        let (_store, index) = fixture();
        let ex = Examiner::new(&index);
        assert_eq!(
            ex.examine(&doc(&index), "sections.name"),
            PropertyValue::ListFound(vec![
                PropertyValue::StringFound("intro".into()),
                PropertyValue::StringFound("body".into()),
            ])
        );
    }

    #[test]
    fn follows_references() {
        let (_store, index) = fixture();
        let ex = Examiner::new(&index);
        let d = doc(&index);
        assert_eq!(ex.examine(&d, "owner.name"), PropertyValue::StringFound("Ada".into()));
        assert_eq!(
            ex.examine(&d, "reviewers.1.name"),
            PropertyValue::StringFound("Grace".into())
        );
        assert_eq!(
            ex.examine(&d, "reviewers.name"),
            PropertyValue::ListFound(vec![
                PropertyValue::StringFound("Ada".into()),
                PropertyValue::StringFound("Grace".into()),
            ])
        );
    }

    #[test]
    fn path_ending_on_a_reference_has_no_value() {
        let (_store, index) = fixture();
        let ex = Examiner::new(&index);
        let d = doc(&index);
        assert_eq!(ex.examine(&d, "owner"), PropertyValue::NoValue);
        assert_eq!(ex.examine(&d, "reviewers.0"), PropertyValue::NoValue);
        assert_eq!(
            ex.examine(&d, "reviewers"),
            PropertyValue::ListFound(vec![PropertyValue::NoValue, PropertyValue::NoValue])
        );
        assert_eq!(ex.examine(&d, ""), PropertyValue::NoValue);
    }

    #[test]
    fn newest_version_wins() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("docs:/org_example_Doc/v", json!({ "state": "old", "legacy": 1 }))
            .expect("put");
        store
            .put_version("docs:/org_example_Doc/v", json!({ "state": "new" }))
            .expect("put");
        let index = StorageIndex::new(StorageId::new("t"), store, WorkerPool::serial());
        let v = index
            .discover(&StorageUri::parse("docs:/org_example_Doc/v").expect("uri"))
            .expect("entry");
        let ex = Examiner::new(&index);
        assert_eq!(ex.examine(&v, "state"), PropertyValue::StringFound("new".into()));
        assert_eq!(ex.examine(&v, "legacy"), PropertyValue::NoValue);
    }

    #[test]
    fn lookup_table_loads_once() {
        let (store, index) = fixture();
        let ex = Examiner::new(&index);
        let d = doc(&index);
        let mut table = LookupTable::new();
        ex.examine_with(&d, "title", &mut table);
        let after_first = store.loads_of(d.uri());
        ex.examine_with(&d, "pages", &mut table);
        ex.examine_with(&d, "draft", &mut table);
        assert_eq!(store.loads_of(d.uri()), after_first);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn non_objects_are_not_found() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_list("docs:/org_example_Doc/d/storedlist/items", &["docs:/org_example_Doc/x"])
            .expect("put");
        let index = StorageIndex::new(StorageId::new("t"), store, WorkerPool::serial());
        let list = index
            .discover(&StorageUri::parse("docs:/org_example_Doc/d/storedlist/items").expect("uri"))
            .expect("list");
        assert!(matches!(
            Examiner::new(&index).examine(&list, "anything"),
            PropertyValue::NotFound(_)
        ));
    }
}
