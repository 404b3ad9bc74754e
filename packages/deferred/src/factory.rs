use std::time::Duration;

use crate::{Deferred, Handle};

/// Produces a fresh [`Deferred`] on every invocation, each resolving to the same value after
/// the same fixed delay.
///
/// Each call to [`create()`][Self::create] schedules its own one-shot timer on the event loop the
/// factory is bound to. The deferred values are independent: resolving one has no effect on any
/// other, and a deferred value created later also starts its delay later.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use deferred::{DelayedValueFactory, EventLoop};
///
/// let event_loop = EventLoop::new();
/// let factory = DelayedValueFactory::new(&event_loop.handle(), Duration::from_millis(10), "data1");
///
/// let (first, second) = event_loop
///     .block_on(async {
///         let first = factory.create().await.unwrap();
///         let second = factory.create().await.unwrap();
///         (first, second)
///     })
///     .unwrap();
///
/// assert_eq!((first, second), ("data1", "data1"));
/// ```
#[derive(Clone, Debug)]
pub struct DelayedValueFactory<T> {
    handle: Handle,
    delay: Duration,
    value: T,
}

impl<T> DelayedValueFactory<T>
where
    T: Clone + 'static,
{
    /// Creates a factory whose deferred values resolve to clones of `value` after `delay`.
    #[must_use]
    pub fn new(handle: &Handle, delay: Duration, value: T) -> Self {
        Self {
            handle: handle.clone(),
            delay,
            value,
        }
    }

    /// Creates a new deferred value and schedules the timer that resolves it.
    ///
    /// The deferred value never fails: the only way it can end without a value is if the event
    /// loop is dropped before the timer fires.
    pub fn create(&self) -> Deferred<T> {
        self.handle.resolve_after(self.delay, self.value.clone())
    }

    /// The delay after which each created deferred value resolves.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }
}
