//! The task abstraction.
//!
//! Callers build a graph out of [`TaskRef`]s and drive it only through the [`Task`] trait:
//! trigger a node, wait for it, print it. [`MemoTask`](crate::MemoTask) is the provided
//! implementation; anything else implementing the trait can sit in the same graph as a
//! dependency.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::TaskError;

/// Shared reference to a task.
///
/// The same dependency may be listed by any number of dependents; none of them owns it.
pub type TaskRef = Arc<dyn Task>;

/// A named, single-invocation unit of work with dependencies.
///
/// `Display` gives a diagnostic line; for [`MemoTask`](crate::MemoTask) it reads
/// `Task:<name>, Executed:<bool>, Error:<result>`.
///
/// # Contract
///
/// - [`trigger`](Task::trigger) may be called any number of times from any number of threads.
///   Only the first call does anything.
/// - [`wait`](Task::wait) and [`completion`](Task::completion) never start execution. Waiting on
///   a task that nothing ever triggers (directly or through a dependent) blocks forever.
/// - Every waiter, before, during or after completion, observes the same outcome.
pub trait Task: fmt::Display + Send + Sync {
    /// Diagnostic label.
    fn name(&self) -> &str;

    /// Starts execution of this task and, transitively, of its unexecuted dependencies.
    ///
    /// Dependencies are triggered concurrently, then waited on one at a time in list order, on
    /// the calling thread. So this call blocks until the dependency chain has resolved up to its
    /// first failure; only the task's own function runs in the background.
    fn trigger(&self);

    /// Blocks until the task has completed and returns its outcome, wrapped with this task's
    /// name.
    fn wait(&self) -> Result<(), TaskError>;

    /// Async counterpart of [`wait`](Task::wait).
    ///
    /// Resolves to the same outcome; works on any executor.
    fn completion(&self) -> BoxFuture<'static, Result<(), TaskError>>;

    /// Whether a trigger call has begun processing this task.
    fn is_triggered(&self) -> bool;

    /// Whether the task's outcome is available, i.e. [`wait`](Task::wait) would not block.
    fn is_completed(&self) -> bool;
}
