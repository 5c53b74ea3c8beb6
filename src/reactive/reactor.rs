//! Batch coalescing and next-tick scheduling.
//!
//! # Invariants
//!
//! 1. Nested batches are supported: only the outermost scope flushes.
//! 2. Inside a batch, observable reads always return the latest value; only
//!    notifications are deferred.
//! 3. Deferred notifications sharing a key collapse into one call (latest
//!    closure wins, first enqueue position kept).
//! 4. `tick()` runs only the tasks queued before it started. Tasks scheduled
//!    while ticking land on the following tick.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, debug_span};

type Deferred = Box<dyn FnOnce()>;

struct DeferredEntry {
    key: usize,
    notify: Deferred,
}

#[derive(Default)]
struct ReactorInner {
    depth: u32,
    deferred: Vec<DeferredEntry>,
    next_tick: VecDeque<Deferred>,
    ticks: u64,
}

/// Shared scheduling context.
///
/// Cloning produces another handle to the same queues.
#[derive(Clone, Default)]
pub struct Reactor {
    inner: Rc<RefCell<ReactorInner>>,
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Reactor")
            .field("depth", &inner.depth)
            .field("deferred", &inner.deferred.len())
            .field("next_tick", &inner.next_tick.len())
            .field("ticks", &inner.ticks)
            .finish()
    }
}

impl Reactor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch scope. Notifications raised while any scope is alive are
    /// delivered when the outermost one drops.
    #[must_use = "dropping the scope immediately flushes the batch"]
    pub fn batch(&self) -> BatchScope {
        self.inner.borrow_mut().depth += 1;
        BatchScope {
            reactor: self.clone(),
        }
    }

    pub fn is_batching(&self) -> bool {
        self.inner.borrow().depth > 0
    }

    /// Queue `f` under `key` if a batch is active, otherwise run it now.
    ///
    /// Returns `true` if the call was deferred.
    pub fn defer_or_run_keyed(&self, key: usize, f: impl FnOnce() + 'static) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.depth == 0 {
            drop(inner);
            f();
            return false;
        }
        if let Some(entry) = inner.deferred.iter_mut().find(|e| e.key == key) {
            entry.notify = Box::new(f);
        } else {
            inner.deferred.push(DeferredEntry {
                key,
                notify: Box::new(f),
            });
        }
        true
    }

    /// Run `task` on the next call to [`Reactor::tick`].
    pub fn schedule(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().next_tick.push_back(Box::new(task));
    }

    /// Number of tasks waiting for the next tick.
    pub fn pending_tasks(&self) -> usize {
        self.inner.borrow().next_tick.len()
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.inner.borrow().ticks
    }

    /// Advance the scheduler by one tick. Returns how many tasks ran.
    pub fn tick(&self) -> usize {
        let tasks: Vec<Deferred> = {
            let mut inner = self.inner.borrow_mut();
            inner.ticks += 1;
            inner.next_tick.drain(..).collect()
        };
        let ran = tasks.len();
        for task in tasks {
            task();
        }
        ran
    }

    fn end_batch(&self) {
        let deferred: Vec<Deferred> = {
            let mut inner = self.inner.borrow_mut();
            inner.depth = inner.depth.saturating_sub(1);
            if inner.depth > 0 {
                return;
            }
            std::mem::take(&mut inner.deferred)
                .into_iter()
                .map(|entry| entry.notify)
                .collect()
        };

        if deferred.is_empty() {
            return;
        }

        let _span = debug_span!("reactor.flush", callbacks = deferred.len()).entered();

        // A panicking subscriber must not starve the rest.
        let mut first_panic: Option<Box<dyn std::any::Any + Send>> = None;
        for notify in deferred {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(notify));
            if let Err(payload) = result
                && first_panic.is_none()
            {
                first_panic = Some(payload);
            }
        }
        debug!("batch flushed");

        if let Some(payload) = first_panic {
            std::panic::resume_unwind(payload);
        }
    }
}

/// RAII guard returned by [`Reactor::batch`].
pub struct BatchScope {
    reactor: Reactor,
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        self.reactor.end_batch();
    }
}
