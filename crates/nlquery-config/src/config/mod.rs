//! Configuration management for nlquery
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. The file lives at
//! `.nlquery/config.toml` and has `[llm]`, `[database]` and `[workflow]`
//! sections.

mod discovery;
mod model;
mod validation;

use std::path::PathBuf;

pub use model::*;

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file, bypassing discovery.
    pub config_path: Option<PathBuf>,
    /// Database path override.
    pub database_path: Option<String>,
    /// Model override.
    pub model: Option<String>,
}
