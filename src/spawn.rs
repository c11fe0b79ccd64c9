//! Execution units.
//!
//! Every concurrent unit of work (triggering a dependency, running a task's own function) gets
//! its own named OS thread. There is no pool and no cap: a graph with many unexecuted nodes may
//! briefly have as many threads as it has pending units. Task graphs are expected to be small,
//! build or pipeline sized, so this is the intended ceiling rather than a hidden one.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::warn;

const DEFAULT_NAME_PREFIX: &str = "memotask";

/// Thread settings for a task's execution units.
///
/// Thread names are `<prefix>-<task name>`.
///
/// ```
/// use std::num::NonZeroUsize;
/// use memotask::ThreadConfig;
///
/// let config = ThreadConfig::new("build")
///     .with_stack_size(NonZeroUsize::new(4 * 1024 * 1024).unwrap());
/// assert_eq!(config.name_prefix(), "build");
/// assert_eq!(config.stack_size(), Some(4 * 1024 * 1024));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadConfig {
    name_prefix: String,
    stack_size: Option<usize>,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_PREFIX)
    }
}

impl ThreadConfig {
    /// Creates a config with the given thread name prefix.
    ///
    /// A blank prefix falls back to the default, `memotask`.
    pub fn new(name_prefix: &str) -> Self {
        let name_prefix = match name_prefix.trim() {
            "" => DEFAULT_NAME_PREFIX.to_string(),
            prefix => prefix.to_string(),
        };

        Self {
            name_prefix,
            stack_size: None,
        }
    }

    /// Sets the stack size (in bytes) for spawned threads.
    ///
    /// The platform may round this up to its own minimum.
    pub fn with_stack_size(mut self, stack_size: NonZeroUsize) -> Self {
        self.stack_size = Some(stack_size.get());
        self
    }

    /// Prefix of every spawned thread's name.
    pub fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    /// Requested stack size in bytes, if any.
    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }

    pub(crate) fn thread_name(&self, unit: &str) -> String {
        // Builder::spawn panics on interior NUL bytes.
        format!("{}-{}", self.name_prefix, unit).replace('\0', "\u{FFFD}")
    }

    pub(crate) fn builder(&self, unit: &str) -> thread::Builder {
        let builder = thread::Builder::new().name(self.thread_name(unit));
        match self.stack_size {
            Some(stack_size) => builder.stack_size(stack_size),
            None => builder,
        }
    }

    /// Runs `f` on a new detached thread.
    ///
    /// If the OS refuses to create the thread, `f` runs inline on the calling thread instead, so
    /// a unit of work is never silently dropped.
    pub(crate) fn spawn<F>(&self, unit: &str, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Builder::spawn consumes the closure even when it fails, so hand it over through a slot
        // that the inline path can take back from.
        let slot = Arc::new(Mutex::new(Some(f)));
        let remote = Arc::clone(&slot);

        let spawned = self.builder(unit).spawn(move || {
            let f = remote.lock().take();
            if let Some(f) = f {
                f();
            }
        });

        if let Err(_err) = spawned {
            #[cfg(feature = "tracing")]
            warn!(unit, error = %_err, "failed to spawn thread, running inline");

            let f = slot.lock().take();
            if let Some(f) = f {
                f();
            }
        }
    }
}
