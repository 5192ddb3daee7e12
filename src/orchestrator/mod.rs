//! Task orchestration
//!
//! A minimal in-process scheduler: tasks are async closures registered on a
//! [`Dag`], linked by dependency edges and executed one at a time in
//! topological order with per-task fixed-delay retries.

mod dag;
mod types;

pub use dag::{Dag, DagRun, TaskAction, TaskRecord};
pub use types::{RetryPolicy, TaskOutcome, TaskState};

#[cfg(test)]
mod tests;
