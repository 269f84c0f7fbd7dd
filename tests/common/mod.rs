//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use ctxlog::{Logger, MemorySink, Pipeline, Severity};
use serde_json::Value;

/// A logger whose three outputs are captured in memory.
pub struct Capture {
    pub info: MemorySink,
    pub error: MemorySink,
    pub console: MemorySink,
    pub logger: Logger,
}

impl Capture {
    pub fn new(min_level: Severity) -> Self {
        let (info, error, console) = (MemorySink::new(), MemorySink::new(), MemorySink::new());
        let logger = Logger::new(Pipeline::new(
            info.clone(),
            error.clone(),
            console.clone(),
            min_level,
        ));
        Self {
            info,
            error,
            console,
            logger,
        }
    }

    /// Console output parsed as one JSON object per line.
    pub fn console_records(&self) -> Vec<Value> {
        self.console
            .lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

/// Concatenated contents of every file in `dir` whose name starts with `prefix`.
pub fn read_prefixed(dir: &Path, prefix: &str) -> String {
    let mut out = String::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            out.push_str(&fs::read_to_string(entry.path()).unwrap());
        }
    }
    out
}
