use thiserror::Error;

/// Explains why awaiting a [`Deferred`][crate::Deferred] did not produce a value.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum DeferredError<E> {
    /// The producer settled the deferred value with an error.
    #[error("deferred value was rejected: {0}")]
    Rejected(E),

    /// The [`Resolver`][crate::Resolver] was dropped without settling the deferred value.
    #[error("resolver was dropped before settling the deferred value")]
    Abandoned,
}

/// Indicates that an [`EventLoop`][crate::EventLoop] could not drive its main future to completion.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum RunError {
    /// The main future is still pending but nothing remains that could ever wake it:
    /// no task is ready to run and no timer is pending.
    #[error(
        "event loop stalled: the main future is pending with no pending timers \
        ({pending_tasks} spawned tasks are also parked)"
    )]
    Stalled {
        /// Spawned tasks that were still parked when the loop gave up.
        pending_tasks: usize,
    },
}
