//! CLI runner - loads the config and runs the pipeline

use crate::cli::commands::Cli;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{Pipeline, RunSummary};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load the configuration file
    pub fn load_config(&self) -> Result<PipelineConfig> {
        info!("Loading config from {}", self.cli.config.display());
        PipelineConfig::from_file(&self.cli.config)
    }

    /// Run the configured pipeline and print a confirmation line
    pub async fn run(&self) -> Result<RunSummary> {
        let config = self.load_config()?;
        let summary = Pipeline::new(&config).run().await?;
        println!("{}", confirmation(&summary));
        Ok(summary)
    }
}

fn confirmation(summary: &RunSummary) -> String {
    let counts: Vec<String> = summary
        .tables
        .iter()
        .map(|(table, rows)| format!("{table}: {rows}"))
        .collect();
    format!("ETL complete ({}): {}", summary.backend, counts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Backend;
    use std::path::PathBuf;

    #[test]
    fn test_confirmation_lists_tables() {
        let mut summary = RunSummary::new(Backend::Warehouse);
        summary.add_table("songplays", 3);
        summary.add_table("users", 2);
        assert_eq!(
            confirmation(&summary),
            "ETL complete (warehouse): songplays: 3, users: 2"
        );
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let runner = Runner::new(Cli {
            config: PathBuf::from("/no/such/songplay.yaml"),
            verbose: false,
        });
        assert!(matches!(
            runner.run().await,
            Err(Error::FileNotFound { .. })
        ));
    }
}
