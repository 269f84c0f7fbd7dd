//! Settings schema.
//!
//! All types derive Serde traits for deserialization from TOML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::level::Severity;
use crate::sink::SinkPolicy;

/// Root settings of the logging layer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory every log path is resolved against (empty: working directory).
    pub root: PathBuf,

    /// Directory of the files created at startup, relative to `root`.
    pub log_dir: String,

    /// File name prefix of the info sink.
    pub info_prefix: String,

    /// File name prefix of the error sink.
    pub error_prefix: String,

    /// Minimum severity written anywhere.
    pub level: Severity,

    /// Keep `log_dir` in the file paths of hourly rotations.
    ///
    /// Off by default: hourly files land directly in `root`.
    pub keep_log_dir_on_rotate: bool,

    /// Rotation policy of both file sinks.
    pub sink: SinkConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            log_dir: "log".to_string(),
            info_prefix: "INFO".to_string(),
            error_prefix: "ERROR".to_string(),
            level: Severity::Info,
            keep_log_dir_on_rotate: false,
            sink: SinkConfig::default(),
        }
    }
}

/// File sink rotation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Megabytes per file before rotation.
    pub max_size_mb: u64,

    /// Rotated files kept per sink.
    pub max_backups: u64,

    /// Days after which files of a sink are deleted.
    pub max_age_days: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 10,
            max_backups: 5,
            max_age_days: 30,
        }
    }
}

impl SinkConfig {
    pub fn policy(&self) -> SinkPolicy {
        SinkPolicy::new(self.max_size_mb, self.max_backups, self.max_age_days)
    }
}
