//! Task graph and sequential executor

use super::types::{RetryPolicy, TaskOutcome, TaskState};
use crate::error::{Error, Result};
use futures::future::{FutureExt, LocalBoxFuture};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tracing::{info, warn};

/// Boxed task body; called once per attempt
pub type TaskAction<'a> = Box<dyn Fn() -> LocalBoxFuture<'a, Result<TaskOutcome>> + 'a>;

struct Task<'a> {
    id: String,
    retry: RetryPolicy,
    action: TaskAction<'a>,
}

/// Directed acyclic graph of tasks
#[derive(Default)]
pub struct Dag<'a> {
    tasks: Vec<Task<'a>>,
    index: HashMap<String, usize>,
    /// `upstream -> downstream` edges by task index
    edges: Vec<(usize, usize)>,
}

impl<'a> Dag<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; ids must be unique
    pub fn add_task<F, Fut>(&mut self, id: &str, retry: RetryPolicy, action: F) -> Result<()>
    where
        F: Fn() -> Fut + 'a,
        Fut: Future<Output = Result<TaskOutcome>> + 'a,
    {
        if self.index.contains_key(id) {
            return Err(Error::config(format!("Duplicate task id '{id}'")));
        }
        self.index.insert(id.to_string(), self.tasks.len());
        self.tasks.push(Task {
            id: id.to_string(),
            retry,
            action: Box::new(move || action().boxed_local()),
        });
        Ok(())
    }

    /// Declare that `downstream` runs after `upstream`
    pub fn add_dependency(&mut self, upstream: &str, downstream: &str) -> Result<()> {
        let from = self.position(upstream)?;
        let to = self.position(downstream)?;
        if from == to {
            return Err(Error::DependencyCycle {
                task: upstream.to_string(),
            });
        }
        if !self.edges.contains(&(from, to)) {
            self.edges.push((from, to));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::unknown_task(id))
    }

    /// Task ids in execution order
    ///
    /// Kahn's algorithm; among ready tasks the one registered first goes
    /// first.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        Ok(self
            .order()?
            .into_iter()
            .map(|i| self.tasks[i].id.clone())
            .collect())
    }

    fn order(&self) -> Result<Vec<usize>> {
        let mut in_degree = vec![0usize; self.tasks.len()];
        for &(_, to) in &self.edges {
            in_degree[to] += 1;
        }

        let mut ready: BTreeSet<usize> = (0..self.tasks.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &(from, to) in &self.edges {
                if from == next {
                    in_degree[to] -= 1;
                    if in_degree[to] == 0 {
                        ready.insert(to);
                    }
                }
            }
        }

        if order.len() < self.tasks.len() {
            let stuck = (0..self.tasks.len())
                .find(|i| in_degree[*i] > 0)
                .map_or_else(String::new, |i| self.tasks[i].id.clone());
            return Err(Error::DependencyCycle { task: stuck });
        }
        Ok(order)
    }

    /// Execute every task once, in topological order
    ///
    /// A failing task is retried per its policy. Once a task exhausts its
    /// retries no further task starts and the rest stay `Pending`.
    pub async fn run(&self) -> Result<DagRun> {
        let order = self.order()?;
        let mut run = DagRun {
            records: self
                .tasks
                .iter()
                .map(|t| TaskRecord {
                    id: t.id.clone(),
                    state: TaskState::Pending,
                    attempts: 0,
                    error: None,
                })
                .collect(),
        };

        for idx in order {
            let upstream_ok = self
                .edges
                .iter()
                .filter(|(_, to)| *to == idx)
                .all(|(from, _)| run.records[*from].state.is_satisfied());
            if !upstream_ok {
                break;
            }

            let task = &self.tasks[idx];
            let record = &mut run.records[idx];
            record.state = TaskState::Running;
            info!("Running task {}", task.id);

            loop {
                record.attempts += 1;
                match (task.action)().await {
                    Ok(outcome) => {
                        record.state = outcome.into();
                        info!("Task {} {}", task.id, record.state);
                        break;
                    }
                    Err(e) if record.attempts <= task.retry.max_retries => {
                        let kind = if e.is_retryable() { "transient" } else { "persistent" };
                        warn!(
                            "Task {} failed ({kind}), attempt {}/{}, retrying in {:?}: {e}",
                            task.id,
                            record.attempts,
                            task.retry.max_retries + 1,
                            task.retry.delay
                        );
                        tokio::time::sleep(task.retry.delay).await;
                    }
                    Err(e) => {
                        warn!(
                            "Task {} failed after {} attempt(s): {e}",
                            task.id, record.attempts
                        );
                        record.state = TaskState::Failed;
                        record.error = Some(e.to_string());
                        break;
                    }
                }
            }

            if record.state == TaskState::Failed {
                break;
            }
        }

        Ok(run)
    }
}

/// Per-task result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub state: TaskState,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Outcome of a whole DAG run, in registration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DagRun {
    records: Vec<TaskRecord>,
}

impl DagRun {
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    fn record(&self, id: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn state(&self, id: &str) -> Option<TaskState> {
        self.record(id).map(|r| r.state)
    }

    pub fn attempts(&self, id: &str) -> Option<u32> {
        self.record(id).map(|r| r.attempts)
    }

    /// Every task ended satisfied
    pub fn succeeded(&self) -> bool {
        self.records.iter().all(|r| r.state.is_satisfied())
    }

    /// Convert the first failed task into an error
    pub fn into_result(self) -> Result<Self> {
        if let Some(failed) = self.records.iter().find(|r| r.state == TaskState::Failed) {
            return Err(Error::TaskFailed {
                task: failed.id.clone(),
                attempts: failed.attempts,
                message: failed.error.clone().unwrap_or_default(),
            });
        }
        Ok(self)
    }
}
