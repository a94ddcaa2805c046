//! # refgraph CLI Module
//!
//! ## Available Commands
//!
//! - `status` - Entry counts per kind and validity
//! - `acquire` - Load one entry and show its references
//! - `render` - Expand the reference graph around an entry
//! - `search` - Camel-hump search over cached URIs
//! - `query` - Evaluate a condition over cached entries

mod commands;

use clap::{Parser, Subcommand};
use refgraph::Config;
use refgraph_core::{IndexingStrategy, RefgraphError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// refgraph - reference graph explorer
///
/// Indexes a directory-backed object store and walks the references
/// between its entries.
#[derive(Parser, Debug)]
#[command(name = "refgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Store root directory
    #[arg(short = 'S', long, global = true)]
    pub store: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Indexing strategy: ON_DEMAND, INITIAL or FULL
    #[arg(long, global = true)]
    pub strategy: Option<IndexingStrategy>,

    /// Worker threads for bulk indexing
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show entry counts per kind
    Status,

    /// Load an entry and list its references
    Acquire {
        /// Entry URI
        uri: String,
    },

    /// Expand the reference graph around an entry
    Render {
        /// Seed URI
        uri: String,

        /// Outgoing rounds (-1: unbounded, 0: off)
        #[arg(long, allow_negative_numbers = true)]
        outgoing: Option<i32>,

        /// Incoming rounds (-1: unbounded, 0: off)
        #[arg(long, allow_negative_numbers = true)]
        incoming: Option<i32>,
    },

    /// Search cached URIs
    Search {
        /// Camel-hump query, e.g. `DocRe`
        query: String,
    },

    /// Evaluate a condition over cached entries
    Query {
        /// Condition file (JSON)
        #[arg(short, long)]
        condition: PathBuf,

        /// Only entries of this type
        #[arg(short = 't', long = "type")]
        type_name: Option<String>,

        /// Only entries of this schema
        #[arg(short, long)]
        schema: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Configuration after file, environment and flags.
    pub fn resolve_config(&self) -> Result<Config, RefgraphError> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env()?;
        if let Some(store) = &self.store {
            config.store = Some(store.clone());
        }
        if let Some(strategy) = self.strategy {
            config.index.strategy = strategy;
        }
        if let Some(workers) = self.workers {
            config.index.workers = workers;
        }
        if let Commands::Render {
            outgoing, incoming, ..
        } = &self.command
        {
            if let Some(limit) = outgoing {
                config.graph.outbound_limit = *limit;
            }
            if let Some(limit) = incoming {
                config.graph.inbound_limit = *limit;
            }
        }
        config.validate()?;
        Ok(config)
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), RefgraphError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json;
    let index = open_index(&config)?;

    match cli.command {
        Commands::Status => cmd_status(&index, json_mode),
        Commands::Acquire { uri } => cmd_acquire(&index, json_mode, &uri),
        Commands::Render { uri, .. } => cmd_render(&index, &config, json_mode, &uri),
        Commands::Search { query } => cmd_search(&index, json_mode, &query),
        Commands::Query {
            condition,
            type_name,
            schema,
        } => cmd_query(&index, json_mode, &condition, type_name, schema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_flags_override_config() {
        let cli = Cli::try_parse_from([
            "refgraph",
            "--strategy",
            "full",
            "render",
            "docs:/org_example_Doc/a",
            "--outgoing",
            "-1",
            "--incoming",
            "2",
        ])
        .expect("parse");
        let config = cli.resolve_config().expect("config");
        assert_eq!(config.index.strategy, IndexingStrategy::Full);
        assert_eq!(config.graph.outbound_limit, -1);
        assert_eq!(config.graph.inbound_limit, 2);
    }

    #[test]
    fn invalid_limits_are_rejected() {
        let cli = Cli::try_parse_from(["refgraph", "render", "docs:/T/a", "--outgoing", "-3"])
            .expect("parse");
        assert!(cli.resolve_config().is_err());
    }
}
