//! # Configuration
//!
//! Optional TOML file with `[index]` and `[graph]` tables:
//!
//! ```toml
//! store = "./data"
//!
//! [index]
//! strategy = "FULL"
//! workers = 8
//!
//! [graph]
//! outbound_limit = 3
//! inbound_limit = -1
//! blacklisted_types = ["AuditLog"]
//! ```
//!
//! Precedence, lowest first: defaults, file, environment
//! (`REFGRAPH_STRATEGY`, `REFGRAPH_WORKERS`), command-line flags.

use refgraph_core::{GraphSettings, IndexSettings, IndexingStrategy, RefgraphError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the indexing strategy.
pub const ENV_STRATEGY: &str = "REFGRAPH_STRATEGY";

/// Environment variable overriding the worker count.
pub const ENV_WORKERS: &str = "REFGRAPH_WORKERS";

/// Resolved application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Store root directory.
    pub store: Option<PathBuf>,
    /// Index population.
    pub index: IndexSettings,
    /// Graph rendering.
    pub graph: GraphSettings,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, RefgraphError> {
        toml::from_str(text).map_err(|e| RefgraphError::Config(e.to_string()))
    }

    /// Read `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, RefgraphError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            RefgraphError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), RefgraphError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), RefgraphError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(strategy) = lookup(ENV_STRATEGY) {
            self.index.strategy = strategy
                .parse::<IndexingStrategy>()
                .map_err(|e| RefgraphError::Config(format!("{}: {}", ENV_STRATEGY, e)))?;
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.index.workers = workers
                .trim()
                .parse()
                .map_err(|e| RefgraphError::Config(format!("{}: {}", ENV_WORKERS, e)))?;
        }
        Ok(())
    }

    /// Reject settings the core would refuse.
    pub fn validate(&self) -> Result<(), RefgraphError> {
        self.index.pool()?;
        self.graph.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tables() {
        let config = Config::from_toml(
            r#"
            store = "data"

            [index]
            strategy = "FULL"
            workers = 3

            [graph]
            outbound_limit = -1
            blacklisted_types = ["Audit"]
            "#,
        )
        .expect("config");
        assert_eq!(config.store, Some(PathBuf::from("data")));
        assert_eq!(config.index.strategy, IndexingStrategy::Full);
        assert_eq!(config.index.workers, 3);
        assert_eq!(config.graph.outbound_limit, -1);
        assert_eq!(config.graph.inbound_limit, 0);
        assert!(config.graph.containment.blacklisted_types.contains("Audit"));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::from_toml("[index]\nstrategy = \"INITIAL\"\n").expect("config");
        config
            .apply_env_from(|key| match key {
                ENV_STRATEGY => Some("on-demand".to_string()),
                ENV_WORKERS => Some("5".to_string()),
                _ => None,
            })
            .expect("env");
        assert_eq!(config.index.strategy, IndexingStrategy::OnDemand);
        assert_eq!(config.index.workers, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_toml("[index]\nstrategy = \"SOMETIMES\"\n").is_err());
        assert!(Config::from_toml("colour = 1\n").is_err());
        let mut config = Config::default();
        assert!(config.apply_env_from(|_| Some("many".to_string())).is_err());
        config.graph.inbound_limit = -5;
        assert!(config.validate().is_err());
    }
}
