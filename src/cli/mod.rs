//! Command-line interface for nlquery
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, engine wiring and command dispatch

pub mod args;
mod run;

pub use args::{Cli, Commands};
pub use run::{build_engine, run};
