//! Memoized, dependency-aware tasks.
//!
//! A [`Task`] wraps a single-argument function, the argument to call it with, and an ordered
//! list of dependency tasks. Triggering a task triggers its unexecuted dependencies
//! concurrently, waits for all of them, then runs its own function exactly once. Any number of
//! callers can wait on the outcome afterwards.
//!
//! # Features
//!
//! - **Execute once, wait many**: however many threads call [`Task::trigger`], the function runs
//!   once, and every waiter sees the same outcome.
//! - **Dependency gating**: a task's function starts only after each dependency's function has
//!   finished successfully. If any dependency fails, the function never runs.
//! - **Readable failure chains**: each level wraps the failure with its task name, so the error
//!   read at the root says `task deploy failed: task build failed: ...` down to the leaf.
//! - **Blocking or async waiting**: [`Task::wait`] blocks a thread, [`Task::completion`] is a
//!   future that works on any executor.
//! - **Optional tracing**: enable the `tracing` feature for structured lifecycle events.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use memotask::{Task, TaskRef};
//!
//! let counter = Arc::new(AtomicI32::new(0));
//!
//! let step = |delta: i32| {
//!     let counter = Arc::clone(&counter);
//!     move |pause: Duration| -> Result<(), String> {
//!         counter.fetch_add(delta, Ordering::SeqCst);
//!         std::thread::sleep(pause);
//!         Ok(())
//!     }
//! };
//!
//! let t1: TaskRef = memotask::new("t1", step(1), None, Duration::from_millis(5));
//! let t2 = memotask::new("t2", step(-1), vec![t1.clone()], Duration::from_millis(10));
//! let t3 = memotask::new("t3", step(1), vec![t1.clone()], Duration::from_millis(50));
//! let t4 = memotask::new("t4", step(1), vec![t3, t2], Duration::from_millis(20));
//!
//! t4.trigger();
//! t4.wait().unwrap();
//! assert_eq!(counter.load(Ordering::SeqCst), 2);
//! ```
//!
//! # Failure propagation
//!
//! ```
//! use memotask::{Task, TaskRef};
//!
//! let fetch: TaskRef = memotask::new("fetch", |_: ()| Err("connection refused"), None, ());
//! let build = memotask::new("build", |_: ()| Ok::<(), String>(()), vec![fetch], ());
//!
//! build.trigger();
//! let err = build.wait().unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "task build failed: task fetch failed: connection refused"
//! );
//! assert_eq!(err.chain(), vec!["build", "fetch"]);
//! ```
//!
//! # Implementation Notes
//!
//! ## `trigger()` blocks on dependencies
//!
//! [`Task::trigger`] fans dependency triggers out to separate threads, then waits on each
//! dependency in list order **on the calling thread**. Only the task's own function runs in the
//! background. Triggering the root of a deep graph therefore blocks until every dependency has
//! resolved (or the first one in list order has failed).
//!
//! ## Unbounded threads
//!
//! Every fan-out and every function run gets its own OS thread. There is no pool. This suits
//! build or pipeline sized graphs; very wide graphs will spawn correspondingly many threads.
//! See [`ThreadConfig`] for thread naming and stack size.
//!
//! ## No cycle detection
//!
//! A cyclic graph deadlocks when triggered: each task waits on a dependency that waits on it.
//!
//! ## Panics
//!
//! Panics inside a task function are not caught. They unwind that function's thread. Waiters
//! are then released with a [`TaskError`] whose root cause is [`ExecError::Abandoned`].

mod error;
mod memo;
mod spawn;
mod task;

pub use error::{BoxError, ExecError, TaskError};
pub use memo::MemoTask;
pub use spawn::ThreadConfig;
pub use task::{Task, TaskRef};

/// Creates a task and returns it as a shareable [`TaskRef`].
///
/// Shorthand for [`MemoTask::new`] followed by [`MemoTask::into_ref`].
pub fn new<A, F, E>(
    name: impl Into<String>,
    function: F,
    dependencies: impl IntoIterator<Item = TaskRef>,
    argument: A,
) -> TaskRef
where
    A: Send + 'static,
    F: FnOnce(A) -> Result<(), E> + Send + 'static,
    E: Into<BoxError>,
{
    MemoTask::new(name, function, dependencies, argument).into_ref()
}
