//! Tests for the `kite` command line front end.

use std::process::{Command, Output};

fn kite(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kite"))
        .args(args)
        .output()
        .expect("failed to start kite")
}

#[test]
fn test_eval_prints_completion_value() {
    let output = kite(&["-e", "6 * 7"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "42");
}

#[test]
fn test_verbose_logging_goes_to_stderr() {
    let output = kite(&["-vv", "-e", "'done'"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "done");
    assert!(String::from_utf8_lossy(&output.stderr).contains("[debug"));
}

#[test]
fn test_uncaught_error_exits_with_failure() {
    let output = kite(&["-e", "null.x"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("TypeError"));
}
