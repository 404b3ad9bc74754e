//! Spawned tasks and the queue of tasks that are ready to be polled.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::Waker;

use futures::task::{ArcWake, waker};

// A poisoned lock means the process is in an unrecoverable/unsafe state and must exit (we panic).
const ERR_POISONED_LOCK: &str = "encountered poisoned ready queue lock - a task waker \
    panicked while holding it, so the set of ready tasks can no longer be trusted";

pub(crate) type LocalTaskFuture = Pin<Box<dyn Future<Output = ()>>>;

/// Something the event loop can poll.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Runnable {
    /// The future passed to `block_on()`.
    Main,

    /// A spawned task, identified by its key in the task slab.
    Task(usize),
}

/// FIFO queue of runnables that have been woken.
///
/// Wakers must be `Send + Sync`, so this is the one piece of loop state that is synchronized.
/// Everything else lives behind the loop's `!Send` handle.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    runnables: Mutex<VecDeque<Runnable>>,
}

impl ReadyQueue {
    pub(crate) fn push(&self, runnable: Runnable) {
        let mut runnables = self.runnables.lock().expect(ERR_POISONED_LOCK);

        // A runnable that is already queued will be polled anyway.
        if !runnables.contains(&runnable) {
            runnables.push_back(runnable);
        }
    }

    pub(crate) fn pop(&self) -> Option<Runnable> {
        self.runnables.lock().expect(ERR_POISONED_LOCK).pop_front()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.runnables.lock().expect(ERR_POISONED_LOCK).is_empty()
    }
}

/// Wakes a runnable by putting it back into the ready queue.
struct RunnableWaker {
    runnable: Runnable,
    queue: Arc<ReadyQueue>,
}

impl ArcWake for RunnableWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.queue.push(arc_self.runnable);
    }
}

pub(crate) fn runnable_waker(runnable: Runnable, queue: &Arc<ReadyQueue>) -> Waker {
    waker(Arc::new(RunnableWaker {
        runnable,
        queue: Arc::clone(queue),
    }))
}

/// A spawned future together with the waker that reschedules it.
pub(crate) struct Task {
    /// `None` while the task is being polled.
    future: Option<LocalTaskFuture>,
    waker: Waker,
}

impl Task {
    pub(crate) fn new(future: LocalTaskFuture, waker: Waker) -> Self {
        Self {
            future: Some(future),
            waker,
        }
    }

    /// Takes the future out for polling, so that no borrow of the task storage is held while
    /// the task runs (it may spawn other tasks).
    pub(crate) fn take_for_poll(&mut self) -> Option<(LocalTaskFuture, Waker)> {
        self.future
            .take()
            .map(|future| (future, self.waker.clone()))
    }

    pub(crate) fn put_back(&mut self, future: LocalTaskFuture) {
        debug_assert!(self.future.is_none(), "task future put back twice");

        self.future = Some(future);
    }
}

impl fmt::Debug for Task {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("polling", &self.future.is_none())
            .finish_non_exhaustive()
    }
}
