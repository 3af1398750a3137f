//! Runs independently-scheduled tasks until a stop signal fires.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::task::TaskLifecycle;
use crate::core::{ChurnError, ChurnResult, Task};

/// Why a task's schedule ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit {
    /// The stop signal fired.
    Stopped,
    /// A tick failed; the task ran no further ticks.
    Failed(ChurnError),
}

/// Final state of one scheduled task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Task name.
    pub name: String,
    /// Ticks started, including a failed one.
    pub ticks: u64,
    /// Why the schedule ended.
    pub exit: TaskExit,
}

/// Outcomes of every task passed to [`run`], in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Per-task outcomes.
    pub outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    /// Outcomes that ended in failure.
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.exit, TaskExit::Failed(_)))
    }

    /// The first task failure, if any.
    pub fn into_result(self) -> ChurnResult<()> {
        self.outcomes
            .into_iter()
            .find_map(|o| match o.exit {
                TaskExit::Failed(err) => Some(err),
                TaskExit::Stopped => None,
            })
            .map_or(Ok(()), Err)
    }
}

/// Run every task on its own timer until `stop` is cancelled or the task fails.
///
/// Returns only after every task has finished and been finalized.
pub async fn run(stop: CancellationToken, tasks: Vec<Box<dyn Task>>) -> RunReport {
    let units: Vec<(String, JoinHandle<TaskOutcome>)> = tasks
        .into_iter()
        .map(|task| {
            let name = task.name().to_string();
            (name, tokio::spawn(run_task(stop.clone(), task)))
        })
        .collect();

    info!(tasks = units.len(), "started churn tasks");

    let mut report = RunReport::default();
    for (name, handle) in units {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(err) => TaskOutcome {
                name,
                ticks: 0,
                exit: TaskExit::Failed(ChurnError::Runtime(format!("task aborted: {err}"))),
            },
        };
        report.outcomes.push(outcome);
    }
    report
}

async fn run_task(stop: CancellationToken, task: Box<dyn Task>) -> TaskOutcome {
    let mut lifecycle = TaskLifecycle::new(task);
    let interval = lifecycle.interval();

    let exit = loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break TaskExit::Stopped,
            () = tokio::time::sleep(interval) => {
                match lifecycle.tick().await {
                    Ok(summary) => debug!(
                        task = %lifecycle.name(),
                        candidates = summary.candidates,
                        deleted = summary.deleted,
                        "tick complete"
                    ),
                    Err(err) => {
                        warn!(task = %lifecycle.name(), %err, "tick failed, stopping task");
                        break TaskExit::Failed(err);
                    }
                }
            }
        }
    };

    lifecycle.terminate();
    info!(task = %lifecycle.name(), ticks = lifecycle.ticks(), "task finished");

    TaskOutcome {
        name: lifecycle.name().to_string(),
        ticks: lifecycle.ticks(),
        exit,
    }
}
