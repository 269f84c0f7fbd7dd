//! Routing configuration.
//!
//! # Data Flow
//! ```text
//! event (facade macro)
//!     → info sink    human-readable   min <= level < WARN
//!     → error sink   human-readable   level >= max(min, WARN)
//!     → console      JSON             level >= min
//! ```
//!
//! # Design Decisions
//! - A `Pipeline` is immutable once built; reconfiguring builds a new one
//! - Each output is a `fmt` layer with its own per-layer filter over one
//!   registry, wrapped in a `tracing::Dispatch`
//! - Events are emitted with `dispatcher::with_default`, so several
//!   pipelines can coexist while one replaces another

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::Dispatch;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

use crate::encoder::{HumanFormat, JsonFormat};
use crate::level::Severity;
use crate::sink::{RotatingSink, SinkPolicy};

/// One complete, immutable logging configuration.
pub struct Pipeline {
    dispatch: Dispatch,
    min_level: Severity,
    info_path: Option<PathBuf>,
    error_path: Option<PathBuf>,
    sinks: Vec<RotatingSink>,
}

/// Whether a record goes to the info sink.
pub fn routes_to_info(level: Severity, min_level: Severity) -> bool {
    level < Severity::Warn && level >= min_level
}

/// Whether a record goes to the error sink.
pub fn routes_to_error(level: Severity, min_level: Severity) -> bool {
    level >= Severity::Warn && level >= min_level
}

/// Whether a record goes to the console.
pub fn routes_to_console(level: Severity, min_level: Severity) -> bool {
    level >= min_level
}

impl Pipeline {
    /// Compose the three outputs from arbitrary writers.
    pub fn new<I, E, C>(info: I, error: E, console: C, min_level: Severity) -> Self
    where
        I: for<'w> MakeWriter<'w> + Send + Sync + 'static,
        E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
        C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let info_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(HumanFormat)
            .with_writer(info)
            .with_filter(filter_fn(move |meta| {
                routes_to_info(Severity::of(meta), min_level)
            }));

        let error_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(HumanFormat)
            .with_writer(error)
            .with_filter(filter_fn(move |meta| {
                routes_to_error(Severity::of(meta), min_level)
            }));

        let console_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(JsonFormat)
            .with_writer(console)
            .with_filter(filter_fn(move |meta| {
                routes_to_console(Severity::of(meta), min_level)
            }));

        let subscriber = tracing_subscriber::registry()
            .with(info_layer)
            .with(error_layer)
            .with(console_layer);

        Self {
            dispatch: Dispatch::new(subscriber),
            min_level,
            info_path: None,
            error_path: None,
            sinks: Vec::new(),
        }
    }

    /// Rotating file sinks at the given paths plus stdout.
    pub fn from_paths(
        info_path: impl Into<PathBuf>,
        error_path: impl Into<PathBuf>,
        min_level: Severity,
        policy: &SinkPolicy,
    ) -> Self {
        let info = RotatingSink::with_policy(info_path, policy.clone());
        let error = RotatingSink::with_policy(error_path, policy.clone());
        let info_path = info.path().to_path_buf();
        let error_path = error.path().to_path_buf();

        let mut pipeline = Self::new(info.clone(), error.clone(), std::io::stdout, min_level);
        pipeline.info_path = Some(info_path);
        pipeline.error_path = Some(error_path);
        pipeline.sinks = vec![info, error];
        pipeline
    }

    /// Run `f` with this pipeline as the active dispatcher.
    pub fn emit<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn min_level(&self) -> Severity {
        self.min_level
    }

    /// Path of the info file, if this pipeline writes to files.
    pub fn info_path(&self) -> Option<&Path> {
        self.info_path.as_deref()
    }

    /// Path of the error file, if this pipeline writes to files.
    pub fn error_path(&self) -> Option<&Path> {
        self.error_path.as_deref()
    }

    /// Flush file sinks and stdout.
    pub fn flush(&self) {
        for sink in &self.sinks {
            let _ = sink.make_writer().flush();
        }
        let _ = std::io::stdout().flush();
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("min_level", &self.min_level)
            .field("info_path", &self.info_path)
            .field("error_path", &self.error_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    struct Capture {
        info: MemorySink,
        error: MemorySink,
        console: MemorySink,
        pipeline: Pipeline,
    }

    fn capture(min_level: Severity) -> Capture {
        let (info, error, console) = (MemorySink::new(), MemorySink::new(), MemorySink::new());
        let pipeline = Pipeline::new(info.clone(), error.clone(), console.clone(), min_level);
        Capture {
            info,
            error,
            console,
            pipeline,
        }
    }

    #[test]
    fn test_routing_predicates() {
        use Severity::*;
        assert!(routes_to_info(Info, Info));
        assert!(!routes_to_info(Warn, Info));
        assert!(!routes_to_info(Debug, Info));
        assert!(routes_to_error(Warn, Info));
        assert!(routes_to_error(Fatal, Info));
        assert!(!routes_to_error(Warn, Error));
        assert!(routes_to_console(Panic, Error));
        assert!(!routes_to_console(Info, Warn));
    }

    #[test]
    fn test_info_goes_to_info_and_console() {
        let c = capture(Severity::Info);
        c.pipeline.emit(|| tracing::info!("hello"));

        assert_eq!(c.info.lines().len(), 1);
        assert!(c.error.contents().is_empty());
        assert_eq!(c.console.lines().len(), 1);
    }

    #[test]
    fn test_warn_goes_to_error_and_console() {
        let c = capture(Severity::Info);
        c.pipeline.emit(|| tracing::warn!("careful"));
        c.pipeline.emit(|| tracing::error!("broken"));

        assert!(c.info.contents().is_empty());
        assert_eq!(c.error.lines().len(), 2);
        assert_eq!(c.console.lines().len(), 2);
    }

    #[test]
    fn test_below_min_goes_nowhere() {
        let c = capture(Severity::Warn);
        c.pipeline.emit(|| {
            tracing::info!("quiet");
            tracing::debug!("quieter");
        });

        assert!(c.info.contents().is_empty());
        assert!(c.error.contents().is_empty());
        assert!(c.console.contents().is_empty());
    }

    #[test]
    fn test_panic_target_routes_as_panic() {
        let c = capture(Severity::Panic);
        c.pipeline.emit(|| {
            tracing::error!("plain error");
            tracing::error!(target: "ctxlog::panic", "about to panic");
        });

        assert_eq!(c.error.lines().len(), 1);
        assert!(c.error.contents().contains("\tPANIC\tabout to panic"));
        assert!(c.console.contents().contains(r#""level":"PANIC""#));
    }

    #[test]
    fn test_pipelines_are_independent() {
        let a = capture(Severity::Info);
        let b = capture(Severity::Error);

        a.pipeline.emit(|| tracing::info!("only a"));
        b.pipeline.emit(|| tracing::info!("filtered by b"));

        assert_eq!(a.console.lines().len(), 1);
        assert!(b.console.contents().is_empty());
    }

    #[test]
    fn test_from_paths_records_paths() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::from_paths(
            dir.path().join("INFO.a.log"),
            dir.path().join("ERROR.a.log"),
            Severity::Info,
            &SinkPolicy::default(),
        );

        assert_eq!(pipeline.info_path(), Some(dir.path().join("INFO.a.log").as_path()));
        assert_eq!(pipeline.error_path(), Some(dir.path().join("ERROR.a.log").as_path()));
        assert_eq!(pipeline.min_level(), Severity::Info);
    }
}
