//! Post-load data quality checks
//!
//! - Value checks run a scalar query and compare it with an expected value
//! - Empty-table checks fail when a named table has no rows
//!
//! An empty list of checks is reported as [`TaskOutcome::Skipped`], never as
//! an error.
//!
//! [`TaskOutcome::Skipped`]: crate::orchestrator::TaskOutcome::Skipped

mod checker;

pub use checker::{QualityChecker, ValueCheck};

#[cfg(test)]
mod tests;
