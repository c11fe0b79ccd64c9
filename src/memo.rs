//! Memoized executor.
//!
//! [`MemoTask`] binds one function to one argument and a list of dependencies, and runs the
//! function at most once no matter how often, or from how many threads, it is triggered.
//!
//! # State machine
//!
//! ```text
//! Idle --trigger()--> Triggering --function returns / dependency fails--> Completed
//! ```
//!
//! - **Claim**: the first `trigger()` flips an atomic flag; every later call returns at once.
//! - **Fan-out**: each dependency's `trigger()` runs on its own thread, fire-and-forget.
//! - **Join**: the claiming call waits on each dependency in list order. The first failure is
//!   stored as this task's result and completes the task without running its function.
//! - **Run**: once every dependency succeeded, the function runs on a fresh thread, stores its
//!   result and fires the completion signal. `trigger()` does not wait for this part.
//!
//! # Completion signal
//!
//! The result lives in a write-once cell that is filled before the signal fires. The signal has
//! two sides, released together:
//!
//! - a latch (flag + condvar) for blocking waiters. It is not an executor, so `wait()` and
//!   `trigger()` also work from inside `futures::executor::block_on` or any other executor;
//! - a oneshot channel whose receiver is made [`Shared`], so every async waiter polls a clone of
//!   the same future.
//!
//! If the signal is dropped without firing (the function panicked and unwound its thread)
//! waiters are released with [`ExecError::Abandoned`] rather than left blocked.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Condvar, Mutex};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::error::{BoxError, ExecError, SharedError, TaskError};
use crate::spawn::ThreadConfig;
use crate::task::{Task, TaskRef};

/// The task function with its argument already bound.
type Job = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

type Outcome = Result<(), SharedError>;

/// Blocking side of the completion signal.
#[derive(Default)]
struct Latch {
    released: Mutex<bool>,
    cond: Condvar,
}

impl Latch {
    fn release(&self) {
        *self.released.lock() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.cond.wait(&mut released);
        }
    }
}

/// Completion signal held by whoever will finish the task.
///
/// Dropping it releases the latch whether or not it fired; an unfired drop also cancels the
/// oneshot. Either way no waiter is left blocked.
struct Signal {
    sender: Option<oneshot::Sender<()>>,
    latch: Arc<Latch>,
}

impl Signal {
    fn fire(mut self) {
        if let Some(sender) = self.sender.take() {
            // `done` keeps a receiver alive for as long as the task, so this cannot fail.
            let _ = sender.send(());
        }
    }
}

impl Drop for Signal {
    fn drop(&mut self) {
        self.latch.release();
    }
}

/// Work that has not started yet. Taken exactly once, by the claiming trigger.
struct Pending {
    job: Job,
    signal: Signal,
}

struct Inner {
    name: Arc<str>,
    dependencies: Vec<TaskRef>,
    config: ThreadConfig,
    triggered: AtomicBool,
    pending: Mutex<Option<Pending>>,
    outcome: OnceLock<Outcome>,
    latch: Arc<Latch>,
    done: Shared<oneshot::Receiver<()>>,
}

/// A task that runs its function exactly once, after all of its dependencies succeeded.
///
/// `MemoTask` is a handle: clones share the same state, and any clone can trigger or wait.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
/// use memotask::{MemoTask, Task, TaskRef};
///
/// let total = Arc::new(AtomicI32::new(0));
///
/// let t = Arc::clone(&total);
/// let load: TaskRef = MemoTask::new("load", move |n: i32| -> Result<(), String> {
///     t.fetch_add(n, Ordering::SeqCst);
///     Ok(())
/// }, None, 40).into_ref();
///
/// let t = Arc::clone(&total);
/// let finish = MemoTask::new("finish", move |n: i32| -> Result<(), String> {
///     t.fetch_add(n, Ordering::SeqCst);
///     Ok(())
/// }, vec![load], 2);
///
/// finish.trigger();
/// finish.wait().unwrap();
/// assert_eq!(total.load(Ordering::SeqCst), 42);
/// ```
#[derive(Clone)]
pub struct MemoTask {
    inner: Arc<Inner>,
}

impl MemoTask {
    /// Creates an untriggered task.
    ///
    /// `argument` is moved into `function` on its single invocation. `dependencies` may be empty
    /// (or `None`). Nothing checks the graph for cycles; triggering a cycle deadlocks.
    pub fn new<A, F, E>(
        name: impl Into<String>,
        function: F,
        dependencies: impl IntoIterator<Item = TaskRef>,
        argument: A,
    ) -> Self
    where
        A: Send + 'static,
        F: FnOnce(A) -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::with_config(
            name,
            function,
            dependencies,
            argument,
            ThreadConfig::default(),
        )
    }

    /// Like [`MemoTask::new`], with explicit thread settings for this task's execution units.
    pub fn with_config<A, F, E>(
        name: impl Into<String>,
        function: F,
        dependencies: impl IntoIterator<Item = TaskRef>,
        argument: A,
        config: ThreadConfig,
    ) -> Self
    where
        A: Send + 'static,
        F: FnOnce(A) -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        let name: String = name.into();
        let (sender, done) = oneshot::channel();
        let latch = Arc::new(Latch::default());
        let signal = Signal {
            sender: Some(sender),
            latch: Arc::clone(&latch),
        };
        let job: Job = Box::new(move || function(argument).map_err(Into::into));

        Self {
            inner: Arc::new(Inner {
                name: Arc::from(name),
                dependencies: dependencies.into_iter().collect(),
                config,
                triggered: AtomicBool::new(false),
                pending: Mutex::new(Some(Pending { job, signal })),
                outcome: OnceLock::new(),
                latch,
                done: done.shared(),
            }),
        }
    }

    /// Dependencies in the order they are joined.
    pub fn dependencies(&self) -> &[TaskRef] {
        &self.inner.dependencies
    }

    /// Erases the concrete type so the task can be listed as a dependency.
    pub fn into_ref(self) -> TaskRef {
        Arc::new(self)
    }
}

impl Inner {
    fn trigger(self: &Arc<Self>) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            #[cfg(feature = "tracing")]
            trace!(task = %self.name, "already triggered");
            return;
        }

        #[cfg(feature = "tracing")]
        debug!(
            task = %self.name,
            dependencies = self.dependencies.len(),
            "triggering task"
        );

        for dependency in &self.dependencies {
            let dependency = Arc::clone(dependency);
            let unit = format!("{}>{}", self.name, dependency.name());
            self.config.spawn(&unit, move || dependency.trigger());
        }

        // Only the claiming call gets here, so the slot is still full.
        let Some(Pending { job, signal }) = self.pending.lock().take() else {
            return;
        };

        for dependency in &self.dependencies {
            if let Err(err) = dependency.wait() {
                #[cfg(feature = "tracing")]
                debug!(
                    task = %self.name,
                    dependency = dependency.name(),
                    error = %err,
                    "dependency failed, skipping task function"
                );

                self.complete(signal, Err(Arc::new(err)));
                return;
            }
        }

        let inner = Arc::clone(self);
        self.config.spawn(&self.name, move || {
            #[cfg(feature = "tracing")]
            trace!(task = %inner.name, "running task function");

            let outcome = job().map_err(SharedError::from);

            #[cfg(feature = "tracing")]
            match &outcome {
                Ok(()) => trace!(task = %inner.name, "task function succeeded"),
                Err(err) => debug!(task = %inner.name, error = %err, "task function failed"),
            }

            inner.complete(signal, outcome);
        });
    }

    fn complete(&self, signal: Signal, outcome: Outcome) {
        // The pending slot is taken once, so this is the only writer.
        let _ = self.outcome.set(outcome);
        signal.fire();
    }

    /// Reads the outcome once the signal has been released. No outcome means it was dropped
    /// unfired.
    fn settle(&self) -> Result<(), TaskError> {
        match self.outcome.get() {
            Some(Ok(())) => Ok(()),
            Some(Err(cause)) => Err(TaskError::new(Arc::clone(&self.name), Arc::clone(cause))),
            None => Err(TaskError::new(
                Arc::clone(&self.name),
                Arc::new(ExecError::Abandoned),
            )),
        }
    }
}

impl Task for MemoTask {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn trigger(&self) {
        self.inner.trigger();
    }

    fn wait(&self) -> Result<(), TaskError> {
        self.inner.latch.wait();
        self.inner.settle()
    }

    fn completion(&self) -> BoxFuture<'static, Result<(), TaskError>> {
        let inner = Arc::clone(&self.inner);
        async move {
            // Canceled means the signal was dropped unfired; `settle` reports that.
            let _ = inner.done.clone().await;
            inner.settle()
        }
        .boxed()
    }

    fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    fn is_completed(&self) -> bool {
        self.inner.outcome.get().is_some()
    }
}

impl fmt::Display for MemoTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task:{}, Executed:{}, Error:",
            self.inner.name,
            self.is_triggered()
        )?;
        match self.inner.outcome.get() {
            Some(Err(cause)) => write!(f, "{cause}"),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for MemoTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoTask")
            .field("name", &self.inner.name)
            .field("dependencies", &self.inner.dependencies.len())
            .field("triggered", &self.is_triggered())
            .field("completed", &self.is_completed())
            .finish()
    }
}
