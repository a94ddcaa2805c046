//! # refgraph
//!
//! Command-line explorer for URI-addressed object stores.
//!
//! ## Usage
//!
//! ```bash
//! # Entry counts per kind
//! refgraph --store ./data status
//!
//! # Load one entry and list its references
//! refgraph --store ./data acquire docs:/org_example_Doc/a1
//!
//! # Expand the graph around an entry
//! refgraph --store ./data --json render docs:/org_example_Doc/a1 --outgoing -1 --incoming 1
//!
//! # Evaluate a condition over all documents
//! refgraph --store ./data query --condition draft.json --type Doc
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // REFGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("REFGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "refgraph=info,refgraph_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
