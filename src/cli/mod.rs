//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! The binary takes no subcommand: it loads the config file, runs the
//! configured backend to completion and prints per-table row counts.

mod commands;
mod runner;

pub use commands::Cli;
pub use runner::Runner;
