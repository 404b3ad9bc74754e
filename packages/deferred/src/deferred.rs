use std::any::type_name;
use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::DeferredError;
use crate::state::Slot;

/// Creates a connected resolver and deferred value.
///
/// The resolver settles the deferred value exactly once, either with a value or an error.
/// If the resolver is dropped without settling, awaiting the deferred value yields
/// [`DeferredError::Abandoned`].
///
/// # Example
///
/// ```rust
/// use deferred::EventLoop;
///
/// let event_loop = EventLoop::new();
/// let (resolver, deferred) = deferred::pair::<&str, String>();
///
/// resolver.resolve("ready");
///
/// let value = event_loop.block_on(deferred).unwrap();
/// assert_eq!(value, Ok("ready"));
/// ```
#[must_use]
pub fn pair<T, E>() -> (Resolver<T, E>, Deferred<T, E>) {
    let slot = Rc::new(RefCell::new(Slot::new()));

    (
        Resolver {
            slot: Rc::clone(&slot),
        },
        Deferred { slot },
    )
}

/// A value that becomes available at a later time, with exactly one eventual outcome.
///
/// Awaiting a `Deferred` suspends the awaiting task until the connected [`Resolver`] settles it.
/// The output is `Ok(value)` on resolution or a [`DeferredError`] if the producer rejected the
/// value or went away without settling it.
///
/// Deferred values are single-threaded; they are meant to be driven by an
/// [`EventLoop`][crate::EventLoop] on the thread that created them.
pub struct Deferred<T, E = Infallible> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Deferred<T, E> {
    /// Creates a deferred value that is already resolved.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        Self::settled(Slot::Resolved(value))
    }

    /// Creates a deferred value that is already rejected.
    #[must_use]
    pub fn rejected(error: E) -> Self {
        Self::settled(Slot::Rejected(error))
    }

    fn settled(slot: Slot<T, E>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(slot)),
        }
    }

    /// Whether awaiting this deferred value would complete without suspending.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.slot.borrow().is_pending()
    }

    /// Takes the outcome if the deferred value has already been settled.
    ///
    /// This is the non-suspending alternative to awaiting. If the value is still pending,
    /// the deferred value is handed back unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the outcome has already been taken by awaiting.
    pub fn try_take(self) -> Result<Result<T, DeferredError<E>>, Self> {
        let outcome = self.slot.borrow_mut().take_settled();

        outcome.ok_or(self)
    }

    /// Registers a continuation that runs once this deferred value resolves.
    ///
    /// The continuation receives the resolved value and returns the next deferred value to wait
    /// for. A rejection (or abandonment) of this deferred value skips the continuation and is
    /// returned as-is.
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
    /// let chained = handle
    ///     .resolve_after::<u32, ()>(Duration::ZERO, 20)
    ///     .then(|first| handle.resolve_after(Duration::ZERO, first + 1));
    ///
    /// assert_eq!(event_loop.block_on(chained).unwrap(), Ok(21));
    /// ```
    pub async fn then<U, F>(self, continuation: F) -> Result<U, DeferredError<E>>
    where
        F: FnOnce(T) -> Deferred<U, E>,
    {
        let value = self.await?;

        continuation(value).await
    }
}

impl<T, E> Future for Deferred<T, E> {
    type Output = Result<T, DeferredError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.slot.borrow_mut().poll_take(cx.waker())
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("state", &self.slot.borrow().name())
            .finish()
    }
}

/// Settles the connected [`Deferred`] exactly once.
///
/// Both settling operations consume the resolver. Dropping a resolver without settling
/// marks the deferred value as abandoned and wakes its awaiter.
pub struct Resolver<T, E = Infallible> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Resolver<T, E> {
    /// Resolves the deferred value, waking the task that awaits it.
    ///
    /// If the deferred value has been dropped, the value is dropped as well.
    pub fn resolve(self, value: T) {
        self.settle(Slot::Resolved(value));
    }

    /// Rejects the deferred value, waking the task that awaits it.
    pub fn reject(self, error: E) {
        self.settle(Slot::Rejected(error));
    }

    /// Settles with either outcome.
    pub fn settle_with(self, outcome: Result<T, E>) {
        match outcome {
            Ok(value) => self.resolve(value),
            Err(error) => self.reject(error),
        }
    }

    /// Whether the deferred value has been dropped, so nobody will observe the outcome.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        Rc::strong_count(&self.slot) == 1
    }

    fn settle(self, settled: Slot<T, E>) {
        let awaiter = self.slot.borrow_mut().settle(settled);

        if let Some(awaiter) = awaiter {
            awaiter.wake();
        }

        // The slot is no longer pending, so dropping us is a no-op.
    }
}

impl<T, E> Drop for Resolver<T, E> {
    fn drop(&mut self) {
        let awaiter = {
            let mut slot = self.slot.borrow_mut();

            if !slot.is_pending() {
                return;
            }

            slot.settle(Slot::Abandoned)
        };

        if let Some(awaiter) = awaiter {
            awaiter.wake();
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    #[cfg_attr(test, mutants::skip)] // No API contract for debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("state", &self.slot.borrow().name())
            .finish()
    }
}
