//! # refgraph
//!
//! Library half of the `refgraph` binary: the pieces the command line is
//! built from, exposed for tests.
//!
//! - `config`: TOML file plus environment overrides
//! - `store`: the directory-backed storage driver

pub mod config;
pub mod store;

pub use config::Config;
pub use store::DirectoryStore;
