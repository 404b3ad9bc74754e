use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use scopeguard::defer;
use slab::Slab;
use tracing::{debug, trace};

use crate::pal::{Clock, ClockFacade};
use crate::task::{ReadyQueue, Runnable, Task, runnable_waker};
use crate::timer::{TimerKey, TimerQueue};
use crate::{Deferred, RunError, Sleep};

/// A single-threaded scheduler for tasks and timers.
///
/// The event loop is an explicitly owned object: create one, obtain a [`Handle`] to spawn tasks
/// and register timers, then drive everything with [`block_on()`][Self::block_on] or
/// [`run()`][Self::run]. Each turn of the loop:
///
/// 1. polls every woken task, in the order they were woken;
/// 2. fires every timer whose deadline has passed, earliest first;
/// 3. if nothing became ready, blocks the thread until the next timer deadline.
///
/// The loop is drained once no task is ready and no timer is pending.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use deferred::EventLoop;
///
/// let event_loop = EventLoop::new();
/// let handle = event_loop.handle();
///
/// let total = event_loop
///     .block_on(async {
///         handle.sleep(Duration::from_millis(5)).await;
///         let value = handle.spawn(async { 40 }).await.unwrap();
///         value + 2
///     })
///     .unwrap();
///
/// assert_eq!(total, 42);
/// ```
pub struct EventLoop {
    core: Rc<Core>,
}

impl EventLoop {
    /// Creates an event loop driven by the operating system monotonic clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(ClockFacade::real())
    }

    pub(crate) fn with_clock(clock: ClockFacade) -> Self {
        let started = clock.now();

        Self {
            core: Rc::new(Core {
                clock,
                started,
                tasks: RefCell::new(Slab::new()),
                timers: RefCell::new(TimerQueue::default()),
                ready: Arc::new(ReadyQueue::default()),
                running: Cell::new(false),
            }),
        }
    }

    /// Returns a handle for spawning tasks and creating timers on this event loop.
    #[must_use]
    pub fn handle(&self) -> Handle {
        Handle {
            core: Rc::clone(&self.core),
        }
    }

    /// Drives `future` to completion, together with every task and timer on the loop.
    ///
    /// After the future completes, the loop keeps running until it is drained, so work spawned
    /// along the way (e.g. timers scheduled for values nobody awaits) still runs to completion
    /// before this returns.
    ///
    /// Only wake sources that belong to this loop keep it running: its timers, its tasks and
    /// deferred values settled by them. The loop never waits for wakes from other threads. A
    /// future that only a foreign thread can wake (e.g. a channel fed by a worker thread) is
    /// reported as stalled once the loop has nothing else to wait for.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Stalled`] if the future is still pending once the loop has drained.
    ///
    /// # Panics
    ///
    /// Panics if called while the event loop is already running, i.e. from inside a task.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, RunError>
    where
        F: Future,
    {
        assert!(
            !self.core.running.replace(true),
            "event loop is already running - block_on() cannot be nested"
        );

        defer! {
            self.core.running.set(false);
        }

        let mut future = pin!(future);
        let main_waker = runnable_waker(Runnable::Main, &self.core.ready);
        let mut main_cx = Context::from_waker(&main_waker);

        let mut output = None;
        self.core.ready.push(Runnable::Main);

        loop {
            while let Some(runnable) = self.core.ready.pop() {
                match runnable {
                    Runnable::Main => {
                        if output.is_none() {
                            trace!("polling main future");

                            if let Poll::Ready(value) = future.as_mut().poll(&mut main_cx) {
                                debug!("main future completed");
                                output = Some(value);
                            }
                        }
                    }
                    Runnable::Task(key) => self.core.poll_task(key),
                }
            }

            if self.core.fire_expired_timers() > 0 {
                continue;
            }

            let Some(deadline) = self.core.timers.borrow().next_deadline() else {
                break;
            };

            trace!(?deadline, "parking until next timer deadline");
            self.core.clock.park_until(deadline);
        }

        output.ok_or_else(|| {
            let pending_tasks = self.core.tasks.borrow().len();
            debug!(pending_tasks, "event loop stalled");

            RunError::Stalled { pending_tasks }
        })
    }

    /// Runs spawned tasks and timers until the loop is drained.
    pub fn run(&self) {
        // An immediately ready main future cannot stall.
        if let Err(error) = self.block_on(async {}) {
            unreachable!("an empty main future cannot stall: {error}");
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Tasks may hold handles to the core, so we must break the cycle. Dropping a task may
        // call back into the core (cancelling timers, waking tasks), so no borrow may be held.
        let tasks = mem::take(&mut *self.core.tasks.borrow_mut());

        if !tasks.is_empty() {
            debug!(
                pending_tasks = tasks.len(),
                "dropping unfinished tasks with the event loop"
            );
        }

        drop(tasks);
    }
}

impl fmt::Debug for EventLoop {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("core", &self.core)
            .finish()
    }
}

/// Spawns tasks and creates timers on the [`EventLoop`] it was obtained from.
///
/// Handles are cheap to clone and are meant to be moved into the futures that run on the loop.
/// They cannot leave the thread that owns the loop.
#[derive(Clone)]
pub struct Handle {
    core: Rc<Core>,
}

impl Handle {
    /// Schedules `future` as a new task on the event loop.
    ///
    /// The task starts running on the next turn of the loop, not inline. The returned
    /// [`Deferred`] resolves to the task's output; dropping it does not cancel the task.
    pub fn spawn<F>(&self, future: F) -> Deferred<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let (resolver, deferred) = crate::pair();

        self.spawn_detached(async move {
            resolver.resolve(future.await);
        });

        deferred
    }

    /// Creates a future that completes after `duration` has elapsed on the loop clock.
    pub fn sleep(&self, duration: Duration) -> Sleep {
        Sleep::new(self.clone(), duration)
    }

    /// Creates a deferred value that resolves to `value` after `delay`.
    ///
    /// This schedules one one-shot timer. Nothing observable happens until the timer fires.
    pub fn resolve_after<T, E>(&self, delay: Duration, value: T) -> Deferred<T, E>
    where
        T: 'static,
        E: 'static,
    {
        self.settle_after(delay, Ok(value))
    }

    /// Creates a deferred value that is rejected with `error` after `delay`.
    pub fn reject_after<T, E>(&self, delay: Duration, error: E) -> Deferred<T, E>
    where
        T: 'static,
        E: 'static,
    {
        self.settle_after(delay, Err(error))
    }

    fn settle_after<T, E>(&self, delay: Duration, outcome: Result<T, E>) -> Deferred<T, E>
    where
        T: 'static,
        E: 'static,
    {
        let (resolver, deferred) = crate::pair();
        let sleep = self.sleep(delay);

        self.spawn_detached(async move {
            sleep.await;
            resolver.settle_with(outcome);
        });

        deferred
    }

    /// The current time on the loop clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.core.clock.now()
    }

    /// Time elapsed on the loop clock since the event loop was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.core.started)
    }

    /// Number of spawned tasks that have not completed yet.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.core.tasks.borrow().len()
    }

    /// Number of registered timers that have not fired yet.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.core.timers.borrow().len()
    }

    fn spawn_detached<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let mut tasks = self.core.tasks.borrow_mut();

        let entry = tasks.vacant_entry();
        let key = entry.key();
        let waker = runnable_waker(Runnable::Task(key), &self.core.ready);
        entry.insert(Task::new(Box::pin(future), waker));

        trace!(task = key, "task spawned");

        self.core.ready.push(Runnable::Task(key));
    }

    pub(crate) fn register_timer(&self, deadline: Instant, waker: Waker) -> TimerKey {
        self.core.timers.borrow_mut().register(deadline, waker)
    }

    pub(crate) fn refresh_timer(&self, key: TimerKey, waker: &Waker) -> bool {
        self.core.timers.borrow_mut().refresh(key, waker)
    }

    pub(crate) fn cancel_timer(&self, key: TimerKey) {
        self.core.timers.borrow_mut().cancel(key);
    }
}

impl fmt::Debug for Handle {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("core", &self.core)
            .finish()
    }
}

/// State shared between the event loop and its handles.
struct Core {
    clock: ClockFacade,
    started: Instant,
    tasks: RefCell<Slab<Task>>,
    timers: RefCell<TimerQueue>,
    ready: Arc<ReadyQueue>,
    running: Cell<bool>,
}

impl Core {
    fn poll_task(&self, key: usize) {
        let lent = {
            let mut tasks = self.tasks.borrow_mut();

            // A task may have been woken after it completed.
            tasks.get_mut(key).and_then(Task::take_for_poll)
        };

        let Some((mut future, waker)) = lent else {
            return;
        };

        trace!(task = key, "polling task");

        match future.as_mut().poll(&mut Context::from_waker(&waker)) {
            Poll::Ready(()) => {
                let finished = self.tasks.borrow_mut().remove(key);
                trace!(task = key, "task completed");

                drop(finished);
                drop(future);
            }
            Poll::Pending => {
                if let Some(task) = self.tasks.borrow_mut().get_mut(key) {
                    task.put_back(future);
                }
            }
        }
    }

    /// Wakes every timer whose deadline has passed. Returns how many fired.
    fn fire_expired_timers(&self) -> usize {
        if self.timers.borrow().next_deadline().is_none() {
            return 0;
        }

        let now = self.clock.now();
        let expired = self.timers.borrow_mut().take_expired(now);

        if !expired.is_empty() {
            debug!(fired = expired.len(), "timers fired");
        }

        let fired = expired.len();

        for waker in expired {
            waker.wake();
        }

        fired
    }
}

impl fmt::Debug for Core {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("clock", &self.clock)
            .field("started", &self.started)
            .field("tasks", &self.tasks.try_borrow().map(|tasks| tasks.len()).ok())
            .field("timers", &self.timers.try_borrow().map(|timers| timers.len()).ok())
            .field("running", &self.running.get())
            .finish_non_exhaustive()
    }
}
