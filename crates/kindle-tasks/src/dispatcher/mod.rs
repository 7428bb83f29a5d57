//! FIFO task queues keyed by [`TaskType`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::task_type::TaskType;

const TASKS_TARGET: &str = "kindle_tasks";

/// Error type returned by task callbacks.
pub type TaskFailure = Box<dyn std::error::Error + Send + Sync>;

type Task = Box<dyn FnOnce() -> Result<(), TaskFailure>>;

/// Errors surfaced while dispatching a task queue.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A task returned an error; later tasks in the queue were discarded.
    #[error("{task_type} task #{position} failed: {source}")]
    Failed {
        /// Queue that was being dispatched.
        task_type: TaskType,
        /// Zero-based position of the failing task within the queue.
        position: usize,
        /// Error returned by the task.
        #[source]
        source: TaskFailure,
    },
}

/// Registry of deferred callbacks grouped by [`TaskType`].
#[derive(Default)]
pub struct TaskDispatcher {
    queues: RefCell<HashMap<TaskType, Vec<Task>>>,
}

impl TaskDispatcher {
    /// Creates a dispatcher with empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `task` to run when `task_type` is dispatched.
    pub fn register_task<F>(&self, task_type: TaskType, task: F)
    where
        F: FnOnce() -> Result<(), TaskFailure> + 'static,
    {
        let mut queues = self.queues.borrow_mut();
        let queue = queues.entry(task_type).or_default();
        queue.push(Box::new(task));
        debug!(
            target: TASKS_TARGET,
            task_type = %task_type,
            pending = queue.len(),
            "task registered"
        );
    }

    /// Number of tasks waiting in the `task_type` queue.
    #[must_use]
    pub fn pending(&self, task_type: TaskType) -> usize {
        self.queues.borrow().get(&task_type).map_or(0, Vec::len)
    }

    /// Runs and removes every task queued under `task_type`, in
    /// registration order.
    ///
    /// The queue is detached before the first task runs, so tasks may
    /// register further tasks; those wait for the next dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Failed`] for the first failing task. Tasks queued
    /// after it are dropped without running.
    pub fn dispatch(&self, task_type: TaskType) -> Result<(), TaskError> {
        let tasks = self
            .queues
            .borrow_mut()
            .remove(&task_type)
            .unwrap_or_default();
        debug!(
            target: TASKS_TARGET,
            task_type = %task_type,
            count = tasks.len(),
            "dispatching tasks"
        );
        for (position, task) in tasks.into_iter().enumerate() {
            task().map_err(|source| TaskError::Failed {
                task_type,
                position,
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for TaskDispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.queues.borrow();
        let mut pending: Vec<(String, usize)> = queues
            .iter()
            .map(|(task_type, tasks)| (task_type.to_string(), tasks.len()))
            .collect();
        pending.sort();
        formatter
            .debug_struct("TaskDispatcher")
            .field("pending", &pending)
            .finish()
    }
}
