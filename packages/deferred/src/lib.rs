#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Deferred values and the single-threaded event loop that settles them.
//!
//! A [`Deferred<T, E>`] is a handle to a computation whose outcome becomes available later:
//! exactly one value of type `T`, or a rejection of type `E`. The producing side is a
//! [`Resolver<T, E>`], obtained together with the deferred value from [`pair()`].
//!
//! Deferred values are driven by an explicitly owned [`EventLoop`]. The loop runs tasks and
//! one-shot timers on the current thread with cooperative scheduling; suspension points are
//! plain `.await` expressions. A [`Handle`] to the loop spawns tasks, creates [`Sleep`] timers
//! and creates deferred values that settle after a delay.
//!
//! [`DelayedValueFactory`] packages the most common of those: every call creates a new deferred
//! value that resolves to the same value after the same delay.
//!
//! # Example
//!
//! Two deferred values awaited one after the other take the sum of their delays:
//!
//! ```rust
//! use std::time::Duration;
//!
//! use deferred::{DelayedValueFactory, EventLoop};
//!
//! let event_loop = EventLoop::new();
//! let handle = event_loop.handle();
//! let factory = DelayedValueFactory::new(&handle, Duration::from_millis(10), "data1");
//!
//! let line = event_loop
//!     .block_on(async {
//!         let data = factory.create().await.unwrap();
//!         let data2 = factory.create().await.unwrap();
//!         format!("Promise: {data} {data2}")
//!     })
//!     .unwrap();
//!
//! assert_eq!(line, "Promise: data1 data1");
//! assert!(handle.elapsed() >= Duration::from_millis(20));
//! ```
//!
//! # Failure
//!
//! Deferred values can fail even if the ones created by [`DelayedValueFactory`] never do:
//!
//! ```rust
//! use std::time::Duration;
//!
//! use deferred::{DeferredError, EventLoop};
//!
//! let event_loop = EventLoop::new();
//! let handle = event_loop.handle();
//!
//! let outcome = event_loop
//!     .block_on(handle.reject_after::<String, _>(Duration::ZERO, "unavailable"))
//!     .unwrap();
//!
//! assert_eq!(outcome, Err(DeferredError::Rejected("unavailable")));
//! ```

mod deferred;
mod error;
mod event_loop;
mod factory;
mod pal;
mod state;
mod task;
mod timer;

pub use deferred::*;
pub use error::*;
pub use event_loop::*;
pub use factory::*;
pub use timer::Sleep;
