//! Traversal configuration.

use crate::containment::ContainmentPredicate;
use crate::primitives::{DEFAULT_INBOUND_LIMIT, DEFAULT_OUTBOUND_LIMIT};
use crate::RefgraphError;
use serde::{Deserialize, Serialize};

/// Round limits and node filter for [`crate::GraphRenderer::render`].
///
/// A limit counts expansion rounds. `-1` is unbounded, `0` disables the
/// direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Incoming expansion rounds.
    pub inbound_limit: i32,
    /// Outgoing expansion rounds.
    pub outbound_limit: i32,
    /// Node filter.
    #[serde(flatten)]
    pub containment: ContainmentPredicate,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            inbound_limit: DEFAULT_INBOUND_LIMIT,
            outbound_limit: DEFAULT_OUTBOUND_LIMIT,
            containment: ContainmentPredicate::default(),
        }
    }
}

impl GraphSettings {
    /// Reject limits below `-1`.
    pub fn validate(&self) -> Result<(), RefgraphError> {
        for (name, limit) in [
            ("inbound_limit", self.inbound_limit),
            ("outbound_limit", self.outbound_limit),
        ] {
            if limit < -1 {
                return Err(RefgraphError::InvalidArgument(format!(
                    "{} must be -1 (unbounded) or at least 0, got {}",
                    name, limit
                )));
            }
        }
        Ok(())
    }

    /// Outgoing rounds; `None` is unbounded.
    #[must_use]
    pub fn outbound_rounds(&self) -> Option<usize> {
        rounds(self.outbound_limit)
    }

    /// Incoming rounds; `None` is unbounded.
    #[must_use]
    pub fn inbound_rounds(&self) -> Option<usize> {
        rounds(self.inbound_limit)
    }
}

fn rounds(limit: i32) -> Option<usize> {
    usize::try_from(limit).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = GraphSettings::default();
        assert_eq!(s.inbound_rounds(), Some(0));
        assert_eq!(s.outbound_rounds(), Some(2));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn minus_one_is_unbounded() {
        let s = GraphSettings {
            outbound_limit: -1,
            ..GraphSettings::default()
        };
        assert_eq!(s.outbound_rounds(), None);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn below_minus_one_is_rejected() {
        let s = GraphSettings {
            inbound_limit: -5,
            ..GraphSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn deserializes_flat_lists() {
        let s: GraphSettings = serde_json::from_str(
            r#"{"outbound_limit": 3, "blacklisted_types": ["Secret"]}"#,
        )
        .expect("settings");
        assert_eq!(s.outbound_limit, 3);
        assert_eq!(s.inbound_limit, 0);
        assert!(!s.containment.test("docs", "Secret"));
    }
}
