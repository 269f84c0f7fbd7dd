//! `fatal!` emits its record, then ends the process with status 1.
//!
//! The test re-runs its own binary with `FATAL_CHILD` set; the child takes
//! the fatal path and the parent inspects its exit status and stdout.

use std::process::Command;

use ctxlog::{Context, Logger, MemorySink, Pipeline, Severity};
use serde_json::Value;

const FATAL_CHILD: &str = "CTXLOG_FATAL_CHILD";

fn fatal_in_child() -> ! {
    let logger = Logger::new(Pipeline::new(
        MemorySink::new(),
        MemorySink::new(),
        std::io::stdout,
        Severity::Info,
    ));
    let ctx = Context::background().with_correlation_id("fatal-1");
    ctxlog::fatal!(logger: &logger, &ctx, "bye", code = 3)
}

#[test]
fn test_fatal_exits_with_status_one() {
    if std::env::var_os(FATAL_CHILD).is_some() {
        fatal_in_child();
    }

    let output = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "test_fatal_exits_with_status_one", "--nocapture", "--test-threads=1"])
        .env(FATAL_CHILD, "1")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let records: Vec<Value> = stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 1, "stdout was: {stdout}");

    let record = &records[0];
    assert_eq!(record["level"], "FATAL");
    assert_eq!(record["msg"], "bye");
    assert_eq!(record["code"], 3);
    assert_eq!(record["logid"], "fatal-1");
    assert!(record["file"].as_str().unwrap().starts_with("fatal.rs:"));
}
