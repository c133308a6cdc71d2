//! CLI argument definitions
//!
//! The `Cli` struct and its subcommands, parsed with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// nlquery - ask a database questions in plain language
#[derive(Parser, Debug)]
#[command(name = "nlquery")]
#[command(about = "Answer natural-language questions with validated read-only SQL")]
#[command(long_about = r#"
nlquery turns a question into a read-only SQL query, runs it against a SQLite
database, repairs the query a bounded number of times if it fails, and prints
the answer as a stream of JSON events, one per line.

EXAMPLES:
  # Ask a question
  nlquery ask "List terminals in Germany"

  # Use a different database for one run
  nlquery ask "How many routes start in Duisburg?" --database data/other.db

  # Show the effective configuration and where each value came from
  nlquery config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > environment > config file > defaults
  Config file is discovered by searching upward from CWD for .nlquery/config.toml
  Use --config to specify an explicit config file path

OUTPUT:
  Each line is {"event": "<kind>", "data": {...}} with kind one of
  query, content, chart, map, done, error.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database to query
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Model to use for completions
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Answer a question and stream the events as JSON lines
    ///
    /// Exits 0 when the stream ends with `done` and 1 when it ends with `error`.
    Ask {
        /// The question, in plain language
        question: String,
    },

    /// Print the effective configuration with the source of each value
    Config,
}
