//! Tests for orchestrator module

use super::*;
use crate::error::{Error, Result};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::time::Duration;

fn quick_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1))
}

#[test]
fn test_retry_policy_defaults() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.delay, Duration::from_secs(300));
    assert_eq!(RetryPolicy::none().max_retries, 0);
}

#[test]
fn test_task_state_satisfaction() {
    assert!(TaskState::Succeeded.is_satisfied());
    assert!(TaskState::Skipped.is_satisfied());
    assert!(!TaskState::Failed.is_satisfied());
    assert!(!TaskState::Pending.is_satisfied());
    assert_eq!(TaskState::from(TaskOutcome::Skipped), TaskState::Skipped);
}

#[test]
fn test_topological_order_respects_edges_and_insertion() {
    let mut dag = Dag::new();
    for id in ["stage_events", "stage_songs", "load_songplays", "load_users", "load_time"] {
        dag.add_task(id, RetryPolicy::none(), || async { Ok(TaskOutcome::Succeeded) })
            .unwrap();
    }
    dag.add_dependency("stage_events", "load_songplays").unwrap();
    dag.add_dependency("stage_songs", "load_songplays").unwrap();
    dag.add_dependency("load_songplays", "load_time").unwrap();
    dag.add_dependency("load_songplays", "load_users").unwrap();

    assert_eq!(
        dag.topological_order().unwrap(),
        vec!["stage_events", "stage_songs", "load_songplays", "load_users", "load_time"]
    );
}

#[test]
fn test_unknown_task_and_duplicates_rejected() {
    let mut dag = Dag::new();
    dag.add_task("a", RetryPolicy::none(), || async { Ok(TaskOutcome::Succeeded) })
        .unwrap();

    assert!(matches!(
        dag.add_dependency("a", "missing"),
        Err(Error::UnknownTask { task }) if task == "missing"
    ));
    assert!(dag
        .add_task("a", RetryPolicy::none(), || async { Ok(TaskOutcome::Succeeded) })
        .is_err());
}

#[test]
fn test_cycle_detected() {
    let mut dag = Dag::new();
    for id in ["a", "b", "c"] {
        dag.add_task(id, RetryPolicy::none(), || async { Ok(TaskOutcome::Succeeded) })
            .unwrap();
    }
    dag.add_dependency("a", "b").unwrap();
    dag.add_dependency("b", "c").unwrap();
    dag.add_dependency("c", "b").unwrap();

    assert!(matches!(
        dag.topological_order(),
        Err(Error::DependencyCycle { .. })
    ));
    assert!(matches!(
        dag.add_dependency("a", "a"),
        Err(Error::DependencyCycle { .. })
    ));
}

#[tokio::test]
async fn test_run_executes_in_order() {
    let log = RefCell::new(Vec::new());
    let mut dag = Dag::new();
    for id in ["first", "second", "third"] {
        let log = &log;
        dag.add_task(id, RetryPolicy::none(), move || async move {
            log.borrow_mut().push(id);
            Ok(TaskOutcome::Succeeded)
        })
        .unwrap();
    }
    dag.add_dependency("second", "third").unwrap();
    dag.add_dependency("third", "first").unwrap();

    let run = dag.run().await.unwrap();
    assert!(run.succeeded());
    assert_eq!(*log.borrow(), vec!["second", "third", "first"]);
    assert_eq!(run.attempts("first"), Some(1));
}

#[tokio::test]
async fn test_skipped_task_satisfies_dependents() {
    let mut dag = Dag::new();
    dag.add_task("checks", RetryPolicy::none(), || async { Ok(TaskOutcome::Skipped) })
        .unwrap();
    dag.add_task("after", RetryPolicy::none(), || async { Ok(TaskOutcome::Succeeded) })
        .unwrap();
    dag.add_dependency("checks", "after").unwrap();

    let run = dag.run().await.unwrap().into_result().unwrap();
    assert_eq!(run.state("checks"), Some(TaskState::Skipped));
    assert_eq!(run.state("after"), Some(TaskState::Succeeded));
}

#[tokio::test]
async fn test_retry_until_success() {
    let calls = Cell::new(0u32);
    let counter = &calls;
    let mut dag = Dag::new();
    dag.add_task("flaky", quick_retry(3), move || async move {
        counter.set(counter.get() + 1);
        if counter.get() < 3 {
            Err(Error::Other("transient".into()))
        } else {
            Ok(TaskOutcome::Succeeded)
        }
    })
    .unwrap();

    let run = dag.run().await.unwrap();
    assert_eq!(run.state("flaky"), Some(TaskState::Succeeded));
    assert_eq!(run.attempts("flaky"), Some(3));
    assert_eq!(calls.get(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_stop_downstream() {
    let mut dag = Dag::new();
    dag.add_task("load", quick_retry(2), || async {
        Err::<TaskOutcome, _>(Error::Other("boom".into()))
    })
    .unwrap();
    dag.add_task("check", RetryPolicy::none(), || async { Ok(TaskOutcome::Succeeded) })
        .unwrap();
    dag.add_task("independent", RetryPolicy::none(), || async {
        Ok(TaskOutcome::Succeeded)
    })
    .unwrap();
    dag.add_dependency("load", "check").unwrap();

    let run = dag.run().await.unwrap();
    assert_eq!(run.state("load"), Some(TaskState::Failed));
    assert_eq!(run.attempts("load"), Some(3));
    assert_eq!(run.state("check"), Some(TaskState::Pending));
    assert_eq!(run.state("independent"), Some(TaskState::Pending));
    assert!(!run.succeeded());

    match run.into_result() {
        Err(Error::TaskFailed {
            task,
            attempts,
            message,
        }) => {
            assert_eq!(task, "load");
            assert_eq!(attempts, 3);
            assert_eq!(message, "boom");
        }
        other => panic!("expected task failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_dag_runs() {
    let dag: Dag<'_> = Dag::new();
    assert!(dag.is_empty());
    let run: Result<DagRun> = dag.run().await;
    assert!(run.unwrap().records().is_empty());
}
