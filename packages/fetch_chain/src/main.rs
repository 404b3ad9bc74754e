#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the fetch chain.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it is covered by the integration tests that spawn the binary instead.

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use deferred::EventLoop;
use fetch_chain::{Config, DEFAULT_DELAY_MS, DEFAULT_LABEL, DEFAULT_VALUE, run_chain};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Fetches a delayed value twice in sequence and prints both results on one line.
///
/// Diagnostics are written to stderr; set `RUST_LOG` (e.g. `RUST_LOG=debug`) to see them.
#[derive(FromArgs)]
struct Args {
    /// delay in milliseconds before each fetched value becomes available
    #[argh(option, default = "DEFAULT_DELAY_MS")]
    delay_ms: u64,

    /// the value each fetch resolves to
    #[argh(option, default = "DEFAULT_VALUE.to_owned()")]
    value: String,

    /// the label printed in front of the fetched values
    #[argh(option, default = "DEFAULT_LABEL.to_owned()")]
    label: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self::default()
            .with_delay(Duration::from_millis(args.delay_ms))
            .with_value(args.value)
            .with_label(args.label)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    init_tracing();

    let args: Args = argh::from_env();
    let config = Config::from(args);

    let event_loop = EventLoop::new();

    match run_chain(&event_loop, &config, &mut io::stdout().lock()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fetch chain failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
