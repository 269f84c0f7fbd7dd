//! Record severities.
//!
//! `tracing` has no PANIC or FATAL level. Both are emitted at
//! `tracing::Level::ERROR` under a dedicated target, and [`Severity::of`]
//! recovers the severity from an event's metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Metadata;

use crate::error::Error;

/// Target of events emitted by the regular leveled macros.
pub const TARGET: &str = "ctxlog";
/// Target of events emitted by `panic!`.
pub const PANIC_TARGET: &str = "ctxlog::panic";
/// Target of events emitted by `fatal!`.
pub const FATAL_TARGET: &str = "ctxlog::fatal";

/// Severity of a log record, ordered from least to most severe.
///
/// Deserialized through [`FromStr`], so settings files accept the same
/// spellings as the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Panic,
    Fatal,
}

impl Severity {
    /// Uppercase label used by both encoders.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Panic => "PANIC",
            Severity::Fatal => "FATAL",
        }
    }

    /// The `tracing` level an event of this severity is emitted at.
    pub fn tracing_level(&self) -> tracing::Level {
        match self {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error | Severity::Panic | Severity::Fatal => tracing::Level::ERROR,
        }
    }

    /// Recover the severity of an event from its metadata.
    ///
    /// TRACE events are treated as DEBUG.
    pub fn of(meta: &Metadata<'_>) -> Severity {
        match *meta.level() {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => match meta.target() {
                PANIC_TARGET => Severity::Panic,
                FATAL_TARGET => Severity::Fatal,
                _ => Severity::Error,
            },
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "panic" => Ok(Severity::Panic),
            "fatal" => Ok(Severity::Fatal),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
