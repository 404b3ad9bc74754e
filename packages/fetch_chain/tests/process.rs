//! Integration tests that run the `fetch_chain` binary as a separate process.

#![cfg(not(miri))]

use std::process::{Command, Output};
use std::time::{Duration, Instant};

use testing::with_watchdog;

const BINARY: &str = env!("CARGO_BIN_EXE_fetch_chain");

/// Runs the binary to completion, failing the test if it hangs.
fn run_to_completion(mut command: Command) -> Output {
    with_watchdog(move || {
        command
            .output()
            .expect("fetch_chain binary should be runnable")
    })
}

/// Runs the binary with the given arguments, with logging left at its default level.
fn run_binary(args: &[&str]) -> Output {
    let mut command = Command::new(BINARY);
    command.args(args).env_remove("RUST_LOG");

    run_to_completion(command)
}

#[test]
fn prints_both_values_on_one_line() {
    let output = run_binary(&[]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Promise: data1 data1\n"
    );
}

#[test]
fn output_waits_for_both_delays() {
    let started = Instant::now();

    let output = run_binary(&[]);

    assert!(output.status.success());
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn repeated_runs_print_the_same_line() {
    let first = run_binary(&["--delay-ms", "1"]);
    let second = run_binary(&["--delay-ms", "1"]);

    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn zero_delay_still_prints_once() {
    let output = run_binary(&["--delay-ms", "0"]);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Promise: data1 data1\n"
    );
}

#[test]
fn value_and_label_are_configurable() {
    let output = run_binary(&["--delay-ms", "1", "--value", "x", "--label", "Got:"]);

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "Got: x x\n");
}

#[test]
fn diagnostics_stay_off_stdout() {
    let mut command = Command::new(BINARY);
    command.args(["--delay-ms", "1"]).env("RUST_LOG", "trace");

    let output = run_to_completion(command);

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Promise: data1 data1\n"
    );
    assert!(!output.stderr.is_empty());
}

#[test]
fn help_exits_successfully() {
    let output = run_binary(&["--help"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--delay-ms"));
}

#[test]
fn unknown_flag_fails() {
    let output = run_binary(&["--no-such-flag"]);

    assert!(!output.status.success());
}
