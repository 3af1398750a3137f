//! Task abstraction and its Idle/Executing/Terminated lifecycle.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::ChurnResult;

/// Outcome of one successful tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// Candidates seen across all synced caches.
    pub candidates: usize,
    /// Objects deleted during the tick.
    pub deleted: usize,
}

/// A recurring unit of churn managed by the scheduler.
///
/// A task is created once, performed once per tick and finalized exactly once when its
/// schedule ends.
#[async_trait]
pub trait Task: Send {
    /// Human-readable name used in logs and reports.
    fn name(&self) -> &str;

    /// Time to wait between ticks.
    fn interval(&self) -> Duration;

    /// Run one tick.
    async fn perform(&mut self) -> ChurnResult<TickSummary>;

    /// Release everything the task holds. Never called while `perform` is in flight.
    fn finalize(&mut self);
}

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for the next tick or the stop signal.
    Idle,
    /// Running one `perform` call.
    Executing,
    /// Finalized; no further ticks.
    Terminated,
}

/// Owns a task for the duration of its schedule and finalizes it on drop.
///
/// Every exit path of the scheduling loop (stop, tick failure, panic, an aborted
/// future) goes through `Drop`, so finalize runs exactly once.
pub(crate) struct TaskLifecycle {
    task: Box<dyn Task>,
    state: TaskState,
    ticks: u64,
}

impl TaskLifecycle {
    pub(crate) fn new(task: Box<dyn Task>) -> Self {
        Self {
            task,
            state: TaskState::Idle,
            ticks: 0,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.task.name()
    }

    pub(crate) fn interval(&self) -> Duration {
        self.task.interval()
    }

    pub(crate) const fn ticks(&self) -> u64 {
        self.ticks
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> TaskState {
        self.state
    }

    /// Idle -> Executing -> Idle around one `perform` call.
    pub(crate) async fn tick(&mut self) -> ChurnResult<TickSummary> {
        debug_assert_eq!(self.state, TaskState::Idle);
        self.state = TaskState::Executing;
        self.ticks += 1;
        let result = self.task.perform().await;
        self.state = TaskState::Idle;
        result
    }

    /// Finalize the task if that has not happened yet.
    pub(crate) fn terminate(&mut self) {
        if self.state == TaskState::Terminated {
            return;
        }
        self.state = TaskState::Terminated;
        self.task.finalize();
    }
}

impl Drop for TaskLifecycle {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingTask {
        finalized: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Task for CountingTask {
        fn name(&self) -> &str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn perform(&mut self) -> ChurnResult<TickSummary> {
            Ok(TickSummary::default())
        }

        fn finalize(&mut self) {
            self.finalized.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn tick_returns_to_idle() {
        let finalized = Arc::new(AtomicUsize::new(0));
        let mut lifecycle = TaskLifecycle::new(Box::new(CountingTask {
            finalized: Arc::clone(&finalized),
        }));
        lifecycle.tick().await.unwrap();
        assert_eq!(lifecycle.state(), TaskState::Idle);
        assert_eq!(lifecycle.ticks(), 1);
    }

    #[test]
    fn terminate_then_drop_finalizes_once() {
        let finalized = Arc::new(AtomicUsize::new(0));
        let mut lifecycle = TaskLifecycle::new(Box::new(CountingTask {
            finalized: Arc::clone(&finalized),
        }));
        lifecycle.terminate();
        assert_eq!(lifecycle.state(), TaskState::Terminated);
        drop(lifecycle);
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_alone_finalizes() {
        let finalized = Arc::new(AtomicUsize::new(0));
        drop(TaskLifecycle::new(Box::new(CountingTask {
            finalized: Arc::clone(&finalized),
        })));
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }
}
