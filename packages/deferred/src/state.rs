//! Deferred value state machine.
//!
//! The following states exist:
//!
//! * pending - the resolver has not settled the value yet; holds the waker of whoever most
//!             recently awaited the deferred value, if anyone has.
//! * resolved - the resolver delivered a value that has not been picked up yet.
//! * rejected - the resolver delivered an error that has not been picked up yet.
//! * abandoned - the resolver was dropped without settling.
//! * consumed - the outcome has been handed out; the slot is dead.
//!
//! Only `pending` may transition to `resolved`, `rejected` or `abandoned`. Every settled state
//! transitions to `consumed` exactly once, when the outcome is taken.

use std::mem;
use std::task::{Poll, Waker};

use crate::DeferredError;

pub(crate) enum Slot<T, E> {
    Pending(Option<Waker>),
    Resolved(T),
    Rejected(E),
    Abandoned,
    Consumed,
}

impl<T, E> Slot<T, E> {
    pub(crate) const fn new() -> Self {
        Self::Pending(None)
    }

    pub(crate) const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Pending(_) => "pending",
            Self::Resolved(_) => "resolved",
            Self::Rejected(_) => "rejected",
            Self::Abandoned => "abandoned",
            Self::Consumed => "consumed",
        }
    }

    /// Moves a pending slot into a settled state.
    ///
    /// Returns the waker of the current awaiter. The caller must wake it only after releasing
    /// any borrow of the slot, since waking may synchronously poll the awaiter.
    ///
    /// # Panics
    ///
    /// Panics if the slot has already been settled.
    #[must_use]
    pub(crate) fn settle(&mut self, settled: Self) -> Option<Waker> {
        debug_assert!(!settled.is_pending(), "a slot can only settle into a settled state");

        match mem::replace(self, settled) {
            Self::Pending(awaiter) => awaiter,
            previous => panic!(
                "deferred value settled twice (was already {})",
                previous.name()
            ),
        }
    }

    /// Takes the outcome out of a settled slot, leaving it consumed.
    ///
    /// Returns `None` and leaves the slot untouched if it is still pending.
    ///
    /// # Panics
    ///
    /// Panics if the outcome has already been taken.
    pub(crate) fn take_settled(&mut self) -> Option<Result<T, DeferredError<E>>> {
        if self.is_pending() {
            return None;
        }

        match mem::replace(self, Self::Consumed) {
            Self::Resolved(value) => Some(Ok(value)),
            Self::Rejected(error) => Some(Err(DeferredError::Rejected(error))),
            Self::Abandoned => Some(Err(DeferredError::Abandoned)),
            Self::Consumed => panic!("deferred value polled after completion"),
            Self::Pending(_) => unreachable!("checked above"),
        }
    }

    /// Takes the outcome if settled, otherwise registers `waker` to be woken on settlement.
    pub(crate) fn poll_take(&mut self, waker: &Waker) -> Poll<Result<T, DeferredError<E>>> {
        if let Self::Pending(awaiter) = self {
            if awaiter
                .as_ref()
                .is_none_or(|existing| !existing.will_wake(waker))
            {
                *awaiter = Some(waker.clone());
            }

            return Poll::Pending;
        }

        self.take_settled().map_or(Poll::Pending, Poll::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_slot_is_pending() {
        let slot = Slot::<i32, ()>::new();

        assert!(slot.is_pending());
        assert_eq!(slot.name(), "pending");
    }

    #[test]
    fn poll_on_pending_registers_awaiter() {
        let mut slot = Slot::<i32, ()>::new();

        assert!(slot.poll_take(Waker::noop()).is_pending());
        assert!(matches!(slot, Slot::Pending(Some(_))));
    }

    #[test]
    fn settle_returns_registered_awaiter() {
        let mut slot = Slot::<i32, ()>::new();
        _ = slot.poll_take(Waker::noop());

        let awaiter = slot.settle(Slot::Resolved(5));

        assert!(awaiter.is_some());
        assert_eq!(slot.take_settled(), Some(Ok(5)));
        assert_eq!(slot.name(), "consumed");
    }

    #[test]
    fn take_settled_on_pending_leaves_slot_alone() {
        let mut slot = Slot::<i32, ()>::new();

        assert_eq!(slot.take_settled(), None);
        assert!(slot.is_pending());
    }

    #[test]
    fn rejected_and_abandoned_map_to_errors() {
        let mut rejected = Slot::<i32, &str>::new();
        _ = rejected.settle(Slot::Rejected("nope"));
        assert_eq!(
            rejected.take_settled(),
            Some(Err(DeferredError::Rejected("nope")))
        );

        let mut abandoned = Slot::<i32, &str>::new();
        _ = abandoned.settle(Slot::Abandoned);
        assert_eq!(abandoned.take_settled(), Some(Err(DeferredError::Abandoned)));
    }

    #[test]
    #[should_panic]
    fn settling_twice_panics() {
        let mut slot = Slot::<i32, ()>::new();
        _ = slot.settle(Slot::Resolved(1));
        _ = slot.settle(Slot::Resolved(2));
    }

    #[test]
    #[should_panic]
    fn taking_twice_panics() {
        let mut slot = Slot::<i32, ()>::new();
        _ = slot.settle(Slot::Resolved(1));
        _ = slot.take_settled();
        _ = slot.take_settled();
    }
}
