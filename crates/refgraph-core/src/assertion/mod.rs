//! # Assertion Evaluator
//!
//! Answers yes/no questions about entries: property paths are resolved to
//! a [`PropertyValue`] by the [`Examiner`], tested by [`Operation`]s, and
//! combined into [`Condition`]s (OR of ANDs) by the [`Evaluator`].

mod condition;
mod examiner;
mod operation;

pub use condition::{Clause, Condition, Evaluator, QuerySpec};
pub use examiner::{Examiner, LookupTable, PropertyValue};
pub use operation::{Assertion, Operation};
