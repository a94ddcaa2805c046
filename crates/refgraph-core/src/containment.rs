//! # Containment Predicate
//!
//! Bounds which entries may become graph nodes. Four optional sets, all
//! ANDed; an empty set imposes no constraint.

use crate::entry::StorageEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Schema/type filter over graph candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainmentPredicate {
    /// Schemas that are always rejected.
    pub blacklisted_schemas: BTreeSet<String>,
    /// Types that are always rejected.
    pub blacklisted_types: BTreeSet<String>,
    /// If non-empty, only these schemas pass.
    pub whitelisted_schemas: BTreeSet<String>,
    /// If non-empty, only these types pass.
    pub whitelisted_types: BTreeSet<String>,
}

impl ContainmentPredicate {
    /// A predicate that accepts everything.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Reject `schemas`.
    #[must_use]
    pub fn blacklist_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_schemas.extend(schemas.into_iter().map(Into::into));
        self
    }

    /// Reject `types`.
    #[must_use]
    pub fn blacklist_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Accept only `schemas`.
    #[must_use]
    pub fn whitelist_schemas<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelisted_schemas.extend(schemas.into_iter().map(Into::into));
        self
    }

    /// Accept only `types`.
    #[must_use]
    pub fn whitelist_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelisted_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Whether an entry of `schema` and `type_name` passes.
    #[must_use]
    pub fn test(&self, schema: &str, type_name: &str) -> bool {
        !self.blacklisted_schemas.contains(schema)
            && !self.blacklisted_types.contains(type_name)
            && (self.whitelisted_schemas.is_empty() || self.whitelisted_schemas.contains(schema))
            && (self.whitelisted_types.is_empty() || self.whitelisted_types.contains(type_name))
    }

    /// [`ContainmentPredicate::test`] on an entry's schema and type name.
    #[must_use]
    pub fn test_entry(&self, entry: &StorageEntry) -> bool {
        self.test(entry.schema(), entry.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_predicate_accepts_everything() {
        assert!(ContainmentPredicate::accept_all().test("docs", "Doc"));
    }

    #[test]
    fn blacklists_reject_members() {
        let p = ContainmentPredicate::default()
            .blacklist_schemas(["audit"])
            .blacklist_types(["Secret"]);
        assert!(!p.test("audit", "Doc"));
        assert!(!p.test("docs", "Secret"));
        assert!(p.test("docs", "Doc"));
    }

    #[test]
    fn whitelists_reject_non_members() {
        let p = ContainmentPredicate::default()
            .whitelist_schemas(["docs"])
            .whitelist_types(["Doc", "Person"]);
        assert!(p.test("docs", "Person"));
        assert!(!p.test("other", "Person"));
        assert!(!p.test("docs", "Invoice"));
    }

    #[test]
    fn blacklist_wins_over_whitelist() {
        let p = ContainmentPredicate::default()
            .whitelist_types(["Doc"])
            .blacklist_types(["Doc"]);
        assert!(!p.test("docs", "Doc"));
    }
}
