//! One-shot timers registered with the event loop.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::Handle;

/// Identifies a registered timer. Orders by deadline first and by registration order second,
/// so timers with equal deadlines fire in the order they were registered.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct TimerKey {
    deadline: Instant,
    sequence: u64,
}

/// Pending timers of one event loop.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    pending: BTreeMap<TimerKey, Waker>,
    next_sequence: u64,
}

impl TimerQueue {
    pub(crate) fn register(&mut self, deadline: Instant, waker: Waker) -> TimerKey {
        let key = TimerKey {
            deadline,
            sequence: self.next_sequence,
        };

        self.next_sequence = self
            .next_sequence
            .checked_add(1)
            .expect("timer sequence numbers cannot realistically be exhausted");

        self.pending.insert(key, waker);

        trace!(?deadline, sequence = key.sequence, "timer registered");

        key
    }

    /// Replaces the waker of a pending timer. Returns `false` if the timer has already fired.
    pub(crate) fn refresh(&mut self, key: TimerKey, waker: &Waker) -> bool {
        let Some(existing) = self.pending.get_mut(&key) else {
            return false;
        };

        if !existing.will_wake(waker) {
            existing.clone_from(waker);
        }

        true
    }

    pub(crate) fn cancel(&mut self, key: TimerKey) {
        if self.pending.remove(&key).is_some() {
            trace!(sequence = key.sequence, "timer cancelled");
        }
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|key| key.deadline)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Removes every timer whose deadline is at or before `now`, returning their wakers in
    /// firing order.
    ///
    /// The caller must wake them only after releasing its borrow of the queue.
    #[must_use]
    pub(crate) fn take_expired(&mut self, now: Instant) -> Vec<Waker> {
        let mut expired = Vec::new();

        while let Some(entry) = self.pending.first_entry() {
            if entry.key().deadline > now {
                break;
            }

            expired.push(entry.remove());
        }

        expired
    }
}

/// A future that completes once a fixed delay has elapsed on its event loop.
///
/// The deadline is fixed when the `Sleep` is created, but the timer is only registered on the
/// first poll. The first poll never completes, not even for a zero delay, so completion is always
/// deferred to a later turn of the event loop.
///
/// Dropping a `Sleep` before it completes cancels its timer.
#[must_use = "futures do nothing unless polled"]
pub struct Sleep {
    handle: Handle,
    deadline: Instant,
    state: SleepState,
}

#[derive(Clone, Copy, Debug)]
enum SleepState {
    Unregistered,
    Registered(TimerKey),
    Elapsed,
}

impl Sleep {
    pub(crate) fn new(handle: Handle, duration: Duration) -> Self {
        let deadline = handle
            .now()
            .checked_add(duration)
            .expect("sleep duration overflows the clock");

        Self {
            handle,
            deadline,
            state: SleepState::Unregistered,
        }
    }

    /// The instant at which the sleep completes.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the timer has fired.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        matches!(self.state, SleepState::Elapsed)
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match self.state {
            SleepState::Unregistered => {
                let key = self
                    .handle
                    .register_timer(self.deadline, cx.waker().clone());
                self.state = SleepState::Registered(key);

                Poll::Pending
            }
            SleepState::Registered(key) => {
                if self.handle.refresh_timer(key, cx.waker()) {
                    Poll::Pending
                } else {
                    self.state = SleepState::Elapsed;
                    Poll::Ready(())
                }
            }
            SleepState::Elapsed => Poll::Ready(()),
        }
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let SleepState::Registered(key) = self.state {
            self.handle.cancel_timer(key);
        }
    }
}

impl fmt::Debug for Sleep {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sleep")
            .field("deadline", &self.deadline)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn later(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn expired_timers_fire_in_deadline_order() {
        let base = Instant::now();
        let mut queue = TimerQueue::default();

        queue.register(later(base, 30), Waker::noop().clone());
        queue.register(later(base, 10), Waker::noop().clone());
        queue.register(later(base, 20), Waker::noop().clone());

        assert_eq!(queue.next_deadline(), Some(later(base, 10)));

        let fired = queue.take_expired(later(base, 20));

        assert_eq!(fired.len(), 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_deadline(), Some(later(base, 30)));
    }

    #[test]
    fn equal_deadlines_keep_registration_order() {
        let base = Instant::now();
        let mut queue = TimerQueue::default();

        let first = queue.register(base, Waker::noop().clone());
        let second = queue.register(base, Waker::noop().clone());

        assert!(first < second);
    }

    #[test]
    fn refresh_reports_fired_timer() {
        let base = Instant::now();
        let mut queue = TimerQueue::default();

        let key = queue.register(base, Waker::noop().clone());
        assert!(queue.refresh(key, Waker::noop()));

        _ = queue.take_expired(base);
        assert!(!queue.refresh(key, Waker::noop()));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let base = Instant::now();
        let mut queue = TimerQueue::default();

        let key = queue.register(base, Waker::noop().clone());
        queue.cancel(key);

        assert!(queue.take_expired(later(base, 1000)).is_empty());
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn nothing_fires_before_deadline() {
        let base = Instant::now();
        let mut queue = TimerQueue::default();

        queue.register(later(base, 100), Waker::noop().clone());

        assert!(queue.take_expired(later(base, 99)).is_empty());
        assert_eq!(queue.take_expired(later(base, 100)).len(), 1);
    }
}
