//! Error types for task execution.
//!
//! There is a single failure kind: a task's function failed, either directly or because one of
//! its dependencies failed first. Each task that reports a failure wraps the error it received
//! with its own name, so the message read at the root of a graph spells out the path from the
//! root down to the failing leaf.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by task functions.
///
/// Anything convertible into this works as a task function's error type: `String`, `&str`,
/// `std::io::Error`, or any other `Error + Send + Sync`.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Stored, shareable form of a task's result.
pub(crate) type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// A task failed, directly or through one of its dependencies.
///
/// Renders as `task <name> failed: <source>`. When the source is itself a `TaskError`
/// (a dependency failure) the messages nest:
///
/// ```text
/// task deploy failed: task build failed: task fetch failed: connection refused
/// ```
///
/// `TaskError` is cheap to clone; every waiter gets its own value carrying the same shared cause.
#[derive(Debug, Clone)]
pub struct TaskError {
    task: Arc<str>,
    source: SharedError,
}

impl TaskError {
    pub(crate) fn new(task: Arc<str>, source: SharedError) -> Self {
        Self { task, source }
    }

    /// Name of the task that reported this error.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Task names along the failure path, from this task down to the one whose function failed.
    ///
    /// ```text
    /// task c failed: task b failed: task a failed: boom   =>   ["c", "b", "a"]
    /// ```
    pub fn chain(&self) -> Vec<&str> {
        let mut names = vec![self.task()];
        let mut current: &(dyn Error + 'static) = &*self.source;
        while let Some(inner) = current.downcast_ref::<TaskError>() {
            names.push(inner.task());
            current = &*inner.source;
        }
        names
    }

    /// The innermost error that is not itself a `TaskError`.
    ///
    /// This is whatever the failing function returned, or [`ExecError`] if the function never
    /// reported a result.
    pub fn root_cause(&self) -> &(dyn Error + Send + Sync + 'static) {
        let mut current = self;
        loop {
            match current.source.downcast_ref::<TaskError>() {
                Some(inner) => current = inner,
                None => return &*current.source,
            }
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} failed: {}", self.task, self.source)
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

/// Failures raised by the executor itself rather than by a task function.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecError {
    /// The completion signal was dropped without firing.
    ///
    /// This happens when the task function panics: the panic is not caught, it unwinds the
    /// execution thread, and the pending signal goes with it.
    Abandoned,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Abandoned => write!(
                f,
                "execution abandoned before completion (the task function panicked)"
            ),
        }
    }
}

impl Error for ExecError {}
