//! Deferred task queues for the Kindle application kernel.
//!
//! Components register callbacks against a [`TaskType`] (for example
//! [`TaskType::PreShutdown`]) and the kernel dispatches each queue at the
//! matching point of the application lifecycle. Tasks are one-shot: a
//! dispatch drains the queue it runs.

mod dispatcher;
mod task_type;

pub use dispatcher::{TaskDispatcher, TaskError, TaskFailure};
pub use task_type::{TaskType, TaskTypeParseError};
