//! CLI arguments

use clap::Parser;
use std::path::PathBuf;

/// Songplay star-schema ETL
#[derive(Parser, Debug)]
#[command(name = "songplay-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short = 'C', long, env = "SONGPLAY_CONFIG", default_value = "songplay.yaml")]
    pub config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
