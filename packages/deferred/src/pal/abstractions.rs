use std::fmt::Debug;
use std::time::Instant;

/// The source of time for an event loop.
///
/// Besides reading the time, the clock is responsible for blocking the thread while the loop
/// has nothing to do but wait for the next timer deadline.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Clock: Debug {
    fn now(&self) -> Instant;

    /// Blocks the current thread until `deadline` has passed.
    ///
    /// Returns immediately if the deadline is already in the past.
    fn park_until(&self, deadline: Instant);
}
