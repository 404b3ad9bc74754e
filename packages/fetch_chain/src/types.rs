use std::convert::Infallible;
use std::io;
use std::time::Duration;

use deferred::{DeferredError, RunError};
use thiserror::Error;

/// Delay after which each fetched value becomes available, unless configured otherwise.
pub const DEFAULT_DELAY_MS: u64 = 100;

/// The value every fetch resolves to, unless configured otherwise.
pub const DEFAULT_VALUE: &str = "data1";

/// The label printed in front of the fetched values, unless configured otherwise.
pub const DEFAULT_LABEL: &str = "Promise:";

/// Configuration of a fetch chain run.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Config {
    /// Delay after which each fetched value becomes available.
    pub delay: Duration,

    /// The value each fetch resolves to.
    pub value: String,

    /// The label printed in front of the fetched values.
    pub label: String,
}

impl Config {
    /// Replaces the delay of each fetch.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replaces the value each fetch resolves to.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Replaces the label printed in front of the fetched values.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            value: DEFAULT_VALUE.to_owned(),
            label: DEFAULT_LABEL.to_owned(),
        }
    }
}

/// What happened during a completed fetch chain run.
///
/// Times are measured on the event loop clock, relative to the creation of the event loop.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ChainReport {
    /// Value of the first fetch.
    pub first: String,

    /// Value of the second fetch.
    pub second: String,

    /// When the first fetch resolved.
    pub first_resolved_after: Duration,

    /// When the second fetch resolved.
    pub second_resolved_after: Duration,

    /// When the output line was written.
    pub written_after: Duration,
}

/// Errors that can occur while running the fetch chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChainError {
    /// The event loop could not drive the chain to completion.
    #[error("event loop failed: {0}")]
    EventLoop(#[from] RunError),

    /// A fetched value never arrived.
    #[error("fetch failed: {0}")]
    Fetch(#[from] DeferredError<Infallible>),

    /// The output line could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_defaults() {
        let config = Config::default();

        assert_eq!(config.delay, Duration::from_millis(DEFAULT_DELAY_MS));
        assert_eq!(config.value, "data1");
        assert_eq!(config.label, "Promise:");
    }

    #[test]
    fn builders_replace_fields() {
        let config = Config::default()
            .with_delay(Duration::ZERO)
            .with_value("v")
            .with_label("L:");

        assert_eq!(config.delay, Duration::ZERO);
        assert_eq!(config.value, "v");
        assert_eq!(config.label, "L:");
    }

    #[test]
    fn chain_error_display_names_cause() {
        let error = ChainError::from(RunError::Stalled { pending_tasks: 1 });

        assert!(error.to_string().contains("stalled"));
    }
}
