//! Owner of the active pipeline.
//!
//! # Design Decisions
//! - The active [`Pipeline`] sits behind an `ArcSwap`; installing a new one
//!   is a single pointer swap, never an in-place edit
//! - An emission loads the current `Arc` once and finishes on it, even if
//!   a rotation swaps in a new pipeline meanwhile
//! - Settings are swapped the same way so the scheduler always rotates
//!   with the latest reloaded values

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use crate::config::Settings;
use crate::level::Severity;
use crate::pipeline::Pipeline;
use crate::rotation::{self, RotationScheduler, RotationTask};

static GLOBAL: OnceLock<Logger> = OnceLock::new();
static GLOBAL_ROTATION: OnceLock<RotationTask> = OnceLock::new();

/// Shared handle to the process logging configuration.
///
/// Clones refer to the same configuration.
#[derive(Clone)]
pub struct Logger {
    pipeline: Arc<ArcSwap<Pipeline>>,
    settings: Arc<ArcSwap<Settings>>,
}

impl Logger {
    /// Wrap an already built pipeline, with default settings.
    pub fn new(pipeline: Pipeline) -> Self {
        Self::with_settings(pipeline, Settings::default())
    }

    pub fn with_settings(pipeline: Pipeline, settings: Settings) -> Self {
        Self {
            pipeline: Arc::new(ArcSwap::from_pointee(pipeline)),
            settings: Arc::new(ArcSwap::from_pointee(settings)),
        }
    }

    /// Logger writing to the startup files derived from `settings`.
    pub fn from_settings(settings: Settings) -> Self {
        let now = chrono::Local::now();
        let (info, error) = rotation::rotation_paths(&settings, now, true);
        let pipeline = Pipeline::from_paths(info, error, settings.level, &settings.sink.policy());
        Self::with_settings(pipeline, settings)
    }

    /// Build a pipeline over rotating files and make it the active one.
    ///
    /// Callable at any time; in-flight emissions finish on the previous one.
    pub fn initialize(
        &self,
        info_path: impl Into<PathBuf>,
        error_path: impl Into<PathBuf>,
        min_level: Severity,
    ) {
        let policy = self.settings.load().sink.policy();
        self.install(Pipeline::from_paths(info_path, error_path, min_level, &policy));
    }

    /// Make `pipeline` the active one and return the previous one.
    pub fn install(&self, pipeline: Pipeline) -> Arc<Pipeline> {
        self.pipeline.swap(Arc::new(pipeline))
    }

    /// Swap in new settings and rebuild the active pipeline on the same files.
    ///
    /// A pipeline without files (custom writers) only gets its settings replaced.
    pub fn apply_settings(&self, settings: Settings) {
        let current = self.current();
        let level = settings.level;
        let policy = settings.sink.policy();
        self.replace_settings(settings);

        if let (Some(info), Some(error)) = (current.info_path(), current.error_path()) {
            self.install(Pipeline::from_paths(info, error, level, &policy));
        }
    }

    /// Swap in new settings without touching the active pipeline.
    ///
    /// They take effect at the next rotation.
    pub fn replace_settings(&self, settings: Settings) -> Arc<Settings> {
        self.settings.swap(Arc::new(settings))
    }

    /// Snapshot of the active pipeline.
    pub fn current(&self) -> Arc<Pipeline> {
        self.pipeline.load_full()
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    pub fn min_level(&self) -> Severity {
        self.pipeline.load().min_level()
    }

    /// Run `f` with the active pipeline as the `tracing` dispatcher.
    pub fn emit<R>(&self, f: impl FnOnce() -> R) -> R {
        self.current().emit(f)
    }

    pub fn flush(&self) {
        self.pipeline.load().flush();
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("pipeline", &*self.pipeline.load())
            .finish()
    }
}

/// The process-wide logger.
///
/// Created on first use from default settings, unless [`set_global`] ran
/// first. A logger created here rotates hourly on its own thread.
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(|| {
        let logger = Logger::from_settings(Settings::default());
        ensure_global_rotation(&logger);
        logger
    })
}

/// Install `logger` as the process-wide logger.
///
/// Fails, returning the logger, if the global one already exists. The
/// installed logger is not rotated unless [`init`](crate::init) runs later.
pub fn set_global(logger: Logger) -> Result<(), Logger> {
    GLOBAL.set(logger)
}

/// Start the hourly loop of the global logger, once per process.
///
/// Always a dedicated thread, so it outlives any runtime that happened to
/// touch the global first.
pub(crate) fn ensure_global_rotation(logger: &Logger) -> &'static RotationTask {
    GLOBAL_ROTATION.get_or_init(|| RotationScheduler::new(logger.clone()).spawn_thread())
}

/// The rotation loop of the global logger, if one was started.
pub fn global_rotation() -> Option<&'static RotationTask> {
    GLOBAL_ROTATION.get()
}
