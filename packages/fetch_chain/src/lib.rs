#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Fetches a delayed value twice in sequence and prints both results on one line.
//!
//! The second fetch only starts after the first one has resolved, so the whole chain takes the
//! sum of both delays. With the default configuration, the output is:
//!
//! ```text
//! Promise: data1 data1
//! ```
//!
//! This crate provides the core logic, exposed via [`run_chain`].
//! The binary entry point is in `main.rs`.

mod types;

use std::io::Write;

use deferred::{DelayedValueFactory, EventLoop, Handle};
use tracing::{debug, info};
pub use types::*;

/// Creates the factory that every fetch of the chain goes through.
#[must_use]
pub fn data_factory(handle: &Handle, config: &Config) -> DelayedValueFactory<String> {
    DelayedValueFactory::new(handle, config.delay, config.value.clone())
}

/// Runs the fetch chain on `event_loop`, writing the result line to `out`.
///
/// Nothing is written until both fetches have resolved. The event loop is drained before this
/// returns.
///
/// # Errors
///
/// Returns an error if the event loop stalls, if a fetch does not deliver a value or if the
/// output line cannot be written. None of these happen with an event loop that is otherwise
/// unused and a writable output.
pub fn run_chain(
    event_loop: &EventLoop,
    config: &Config,
    out: &mut impl Write,
) -> Result<ChainReport, ChainError> {
    let handle = event_loop.handle();
    let factory = data_factory(&handle, config);

    debug!(delay = ?config.delay, "starting fetch chain");

    let report = event_loop.block_on(async {
        let first = factory.create().await?;
        let first_resolved_after = handle.elapsed();
        info!(value = %first, after = ?first_resolved_after, "first fetch resolved");

        let second = factory.create().await?;
        let second_resolved_after = handle.elapsed();
        info!(value = %second, after = ?second_resolved_after, "second fetch resolved");

        writeln!(out, "{} {first} {second}", config.label)?;
        out.flush()?;

        Ok::<_, ChainError>(ChainReport {
            first,
            second,
            first_resolved_after,
            second_resolved_after,
            written_after: handle.elapsed(),
        })
    })??;

    debug!(after = ?report.written_after, "fetch chain completed");

    Ok(report)
}
