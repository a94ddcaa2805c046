//! # Conditions
//!
//! A [`Condition`] is an OR of [`Clause`]s, each an AND of assertions.
//! There is no deeper nesting.

use super::examiner::{Examiner, LookupTable};
use super::operation::Assertion;
use crate::entry::StorageEntry;
use crate::index::StorageIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Conjunction of assertions. An empty clause holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub assertions: Vec<Assertion>,
}

impl Clause {
    #[must_use]
    pub fn all(assertions: Vec<Assertion>) -> Self {
        Self { assertions }
    }
}

/// Disjunction of clauses. An empty condition never holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub clauses: Vec<Clause>,
}

impl Condition {
    #[must_use]
    pub fn any(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// A single-clause condition.
    #[must_use]
    pub fn all(assertions: Vec<Assertion>) -> Self {
        Self::any(vec![Clause::all(assertions)])
    }
}

/// Entries to select: type and schema filters plus a condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    /// Only entries of this type name.
    pub type_name: Option<String>,
    /// Only entries of this schema.
    pub schema: Option<String>,
    pub condition: Condition,
}

impl QuerySpec {
    fn selects(&self, entry: &StorageEntry) -> bool {
        self.type_name.as_deref().is_none_or(|t| t == entry.type_name())
            && self.schema.as_deref().is_none_or(|s| s == entry.schema())
    }
}

/// Evaluates conditions against entries of one index.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    index: &'a StorageIndex,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(index: &'a StorageIndex) -> Self {
        Self { index }
    }

    /// Whether `entry` satisfies `condition`.
    ///
    /// Each entry reached during the evaluation is loaded at most once.
    #[must_use]
    pub fn evaluate(&self, condition: &Condition, entry: &StorageEntry) -> bool {
        let examiner = Examiner::new(self.index);
        let mut table = LookupTable::new();
        condition.clauses.iter().any(|clause| {
            clause.assertions.iter().all(|assertion| {
                let value = examiner.examine_with(entry, &assertion.prop, &mut table);
                let holds = assertion.op.test(&value);
                debug!(uri = %entry.uri(), prop = %assertion.prop, %value, holds, "assertion");
                holds
            })
        })
    }

    /// Cached entries selected by `spec`, ordered by URI.
    ///
    /// Entries are evaluated on the index's pool.
    #[must_use]
    pub fn query(&self, spec: &QuerySpec) -> Vec<Arc<StorageEntry>> {
        let candidates: Vec<Arc<StorageEntry>> = self
            .index
            .entities()
            .into_iter()
            .filter(|e| spec.selects(e))
            .collect();
        let verdicts = self
            .index
            .pool()
            .map(&candidates, |entry| self.evaluate(&spec.condition, entry));
        let matched: Vec<_> = candidates
            .into_iter()
            .zip(verdicts)
            .filter_map(|(entry, verdict)| verdict.unwrap_or(false).then_some(entry))
            .collect();
        info!(matched = matched.len(), "query evaluated");
        matched
    }
}
