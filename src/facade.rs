//! Leveled logging entry points.
//!
//! # Responsibilities
//! - `info!`, `warn!`, `error!`, `fatal!`, `panic!` macros
//! - Resolve the correlation id from the caller's [`Context`](crate::Context)
//! - Capture the call site of the macro invocation
//! - Append `logid` and `file` after the caller's fields
//!
//! # Usage
//! ```no_run
//! use ctxlog::Context;
//!
//! let ctx = Context::background().with_new_correlation_id();
//! ctxlog::warn!(&ctx, "disk low", pct = 91);
//!
//! let logger = ctxlog::global().clone();
//! ctxlog::info!(logger: &logger, &ctx, "served", status = 200, path = %"/health");
//! ```
//!
//! Fields use `tracing` syntax (`key = value`, `key = %display`, `key = ?debug`).
//! Without `logger:` the process-wide [`global`](crate::global) logger is used.

use std::fmt;
use std::io::Write;
use std::panic::Location;

use crate::logger::Logger;

/// Source location of a leveled log call.
///
/// Displays in short form: file base name and line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    file: &'static str,
    line: u32,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// File base name without directories.
    pub fn short_file(&self) -> &'static str {
        self.file.rsplit(['/', '\\']).next().unwrap_or(self.file)
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.short_file(), self.line)
    }
}

/// Flush everything and exit with status 1. Used by `fatal!`.
#[doc(hidden)]
pub fn terminate(logger: &Logger) -> ! {
    logger.flush();
    let _ = std::io::stderr().flush();
    std::process::exit(1)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __emit {
    ($logger:expr, $ctx:expr, $site:expr, $severity:expr, $target:expr, $level:expr, $msg:expr $(, $($fields:tt)+)?) => {{
        let __ctx: &$crate::Context = &$ctx;
        let __site: $crate::CallSite = $site;
        $crate::observability::metrics::record_emitted($severity);
        ($logger).emit(|| {
            $crate::__tracing::event!(
                target: $target,
                $level,
                $($($fields)+ ,)?
                logid = __ctx.correlation_id(),
                file = %__site,
                "{}",
                $msg
            )
        });
    }};
}

/// Emit an INFO record.
#[macro_export]
macro_rules! info {
    (logger: $logger:expr, $ctx:expr, $msg:expr $(,)?) => {
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Info, "ctxlog", $crate::__tracing::Level::INFO, $msg)
    };
    (logger: $logger:expr, $ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Info, "ctxlog", $crate::__tracing::Level::INFO, $msg, $($fields)+)
    };
    ($ctx:expr, $msg:expr $(,)?) => {
        $crate::info!(logger: $crate::global(), $ctx, $msg)
    };
    ($ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::info!(logger: $crate::global(), $ctx, $msg, $($fields)+)
    };
}

/// Emit a WARN record.
#[macro_export]
macro_rules! warn {
    (logger: $logger:expr, $ctx:expr, $msg:expr $(,)?) => {
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Warn, "ctxlog", $crate::__tracing::Level::WARN, $msg)
    };
    (logger: $logger:expr, $ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Warn, "ctxlog", $crate::__tracing::Level::WARN, $msg, $($fields)+)
    };
    ($ctx:expr, $msg:expr $(,)?) => {
        $crate::warn!(logger: $crate::global(), $ctx, $msg)
    };
    ($ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::warn!(logger: $crate::global(), $ctx, $msg, $($fields)+)
    };
}

/// Emit an ERROR record.
#[macro_export]
macro_rules! error {
    (logger: $logger:expr, $ctx:expr, $msg:expr $(,)?) => {
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Error, "ctxlog", $crate::__tracing::Level::ERROR, $msg)
    };
    (logger: $logger:expr, $ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Error, "ctxlog", $crate::__tracing::Level::ERROR, $msg, $($fields)+)
    };
    ($ctx:expr, $msg:expr $(,)?) => {
        $crate::error!(logger: $crate::global(), $ctx, $msg)
    };
    ($ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::error!(logger: $crate::global(), $ctx, $msg, $($fields)+)
    };
}

/// Emit a PANIC record, then panic with the message.
///
/// Meant to be caught by [`recover`](crate::recover) up the stack.
#[macro_export]
macro_rules! panic {
    (logger: $logger:expr, $ctx:expr, $msg:expr $(,)?) => {{
        let __msg = $msg;
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Panic, "ctxlog::panic", $crate::__tracing::Level::ERROR, &__msg);
        ::std::panic!("{}", __msg)
    }};
    (logger: $logger:expr, $ctx:expr, $msg:expr, $($fields:tt)+) => {{
        let __msg = $msg;
        $crate::__emit!($logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Panic, "ctxlog::panic", $crate::__tracing::Level::ERROR, &__msg, $($fields)+);
        ::std::panic!("{}", __msg)
    }};
    ($ctx:expr, $msg:expr $(,)?) => {
        $crate::panic!(logger: $crate::global(), $ctx, $msg)
    };
    ($ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::panic!(logger: $crate::global(), $ctx, $msg, $($fields)+)
    };
}

/// Emit a FATAL record, flush, and exit the process with status 1.
#[macro_export]
macro_rules! fatal {
    (logger: $logger:expr, $ctx:expr, $msg:expr $(,)?) => {{
        let __logger: &$crate::Logger = $logger;
        $crate::__emit!(__logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Fatal, "ctxlog::fatal", $crate::__tracing::Level::ERROR, $msg);
        $crate::facade::terminate(__logger)
    }};
    (logger: $logger:expr, $ctx:expr, $msg:expr, $($fields:tt)+) => {{
        let __logger: &$crate::Logger = $logger;
        $crate::__emit!(__logger, $ctx, $crate::CallSite::new(::std::file!(), ::std::line!()),
            $crate::Severity::Fatal, "ctxlog::fatal", $crate::__tracing::Level::ERROR, $msg, $($fields)+);
        $crate::facade::terminate(__logger)
    }};
    ($ctx:expr, $msg:expr $(,)?) => {
        $crate::fatal!(logger: $crate::global(), $ctx, $msg)
    };
    ($ctx:expr, $msg:expr, $($fields:tt)+) => {
        $crate::fatal!(logger: $crate::global(), $ctx, $msg, $($fields)+)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::level::Severity;
    use crate::pipeline::Pipeline;
    use crate::sink::MemorySink;
    use serde_json::Value;

    struct Capture {
        info: MemorySink,
        error: MemorySink,
        console: MemorySink,
        logger: Logger,
    }

    fn capture(level: Severity) -> Capture {
        let (info, error, console) = (MemorySink::new(), MemorySink::new(), MemorySink::new());
        let logger = Logger::new(Pipeline::new(info.clone(), error.clone(), console.clone(), level));
        Capture {
            info,
            error,
            console,
            logger,
        }
    }

    fn console_records(sink: &MemorySink) -> Vec<Value> {
        sink.lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_call_site_short_form() {
        let site = CallSite::new("src/handlers/user.rs", 42);
        assert_eq!(site.to_string(), "user.rs:42");
        assert_eq!(CallSite::new(r"C:\app\main.rs", 7).to_string(), "main.rs:7");
        assert_eq!(CallSite::new("lib.rs", 1).short_file(), "lib.rs");
    }

    #[test]
    fn test_track_caller_location() {
        #[track_caller]
        fn where_am_i() -> CallSite {
            CallSite::caller()
        }
        let expected_line = line!() + 1;
        let site = where_am_i();
        assert_eq!(site.line(), expected_line);
        assert_eq!(site.short_file(), "facade.rs");
    }

    #[test]
    fn test_warn_record_shape() {
        let c = capture(Severity::Info);
        let ctx = Context::background().with_new_correlation_id();

        crate::warn!(logger: &c.logger, &ctx, "disk low", pct = 91);

        let records = console_records(&c.console);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record["level"], "WARN");
        assert_eq!(record["msg"], "disk low");
        assert_eq!(record["pct"], 91);
        assert_eq!(record["logid"], ctx.correlation_id());
        assert!(record["file"].as_str().unwrap().starts_with("facade.rs:"));
        assert!(c.info.contents().is_empty());
        assert_eq!(c.error.lines().len(), 1);
    }

    #[test]
    fn test_file_points_at_invocation_line() {
        let c = capture(Severity::Info);
        let ctx = Context::background();

        let line = line!() + 1;
        crate::info!(logger: &c.logger, &ctx, "here");

        let records = console_records(&c.console);
        assert_eq!(records[0]["file"], format!("facade.rs:{line}"));
    }

    #[test]
    fn test_missing_id_is_empty_string() {
        let c = capture(Severity::Info);
        crate::info!(logger: &c.logger, Context::background(), "anonymous");

        let records = console_records(&c.console);
        assert_eq!(records[0]["logid"], "");
    }

    #[test]
    fn test_caller_fields_come_first() {
        let c = capture(Severity::Info);
        let ctx = Context::background().with_correlation_id("abc");

        crate::error!(logger: &c.logger, &ctx, "failed", attempt = 3, reason = %"timeout");

        let records = console_records(&c.console);
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["level", "ts", "msg", "attempt", "reason", "logid", "file"]);
        assert!(c.error.contents().contains(r#""logid":"abc""#));
    }

    #[test]
    fn test_info_routes_to_info_sink() {
        let c = capture(Severity::Info);
        let ctx = Context::background().with_new_correlation_id();
        crate::info!(logger: &c.logger, &ctx, "started", port = 8080u16);

        assert_eq!(c.info.lines().len(), 1);
        assert!(c.info.contents().contains("\tINFO\tstarted\t"));
        assert!(c.error.contents().is_empty());
        assert_eq!(c.console.lines().len(), 1);
    }

    #[test]
    fn test_below_min_level_is_dropped() {
        let c = capture(Severity::Error);
        let ctx = Context::background();
        crate::info!(logger: &c.logger, &ctx, "hidden");
        crate::warn!(logger: &c.logger, &ctx, "hidden too");

        assert!(c.info.contents().is_empty());
        assert!(c.error.contents().is_empty());
        assert!(c.console.contents().is_empty());
    }

    #[test]
    fn test_panic_macro_emits_then_panics() {
        let c = capture(Severity::Info);
        let ctx = Context::background().with_correlation_id("p-1");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            crate::panic!(logger: &c.logger, &ctx, "invariant broken", slot = 4)
        }));

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "invariant broken");
        let records = console_records(&c.console);
        assert_eq!(records[0]["level"], "PANIC");
        assert_eq!(records[0]["slot"], 4);
        assert!(c.error.contents().contains("\tPANIC\tinvariant broken"));
    }
}
