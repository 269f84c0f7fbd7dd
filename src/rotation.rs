//! Hourly rotation of the file sinks.
//!
//! # Data Flow
//! ```text
//! start()
//!     → rotate(first)      log/INFO.<ts>.log, log/ERROR.<ts>.log
//!     → spawn loop (tokio task, or a thread outside a runtime):
//!         sleep until the next top of the hour
//!         → rotate(later)  INFO.<ts>.log, ERROR.<ts>.log
//! ```
//!
//! # Design Decisions
//! - Later rotations drop `log_dir` from the paths unless
//!   `keep_log_dir_on_rotate` is set; existing deployments rely on that layout
//! - Each rotation reads the logger's current settings, so reloaded
//!   settings apply from the next hour on
//! - The loop never ends on its own; abort the returned [`RotationTask`]
//!   to stop it. Dropping the task detaches it

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local, Timelike};
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::context::Context;
use crate::level::Severity;
use crate::logger::Logger;
use crate::observability::metrics;

/// `strftime` pattern of the timestamp embedded in file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Source of wall-clock time for the scheduler.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Local>;
}

/// The system's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Info and error file paths for a rotation happening at `now`.
///
/// The first rotation puts files under `root/log_dir`; later ones put them
/// directly under `root` unless `keep_log_dir_on_rotate` is set.
pub fn rotation_paths(settings: &Settings, now: DateTime<Local>, first: bool) -> (PathBuf, PathBuf) {
    let stamp = now.format(FILE_TIMESTAMP_FORMAT);
    let dir = if first || settings.keep_log_dir_on_rotate {
        settings.root.join(&settings.log_dir)
    } else {
        settings.root.clone()
    };
    (
        dir.join(format!("{}.{}.log", settings.info_prefix, stamp)),
        dir.join(format!("{}.{}.log", settings.error_prefix, stamp)),
    )
}

/// Time left until the next top of the hour, in local time.
pub fn until_next_hour(now: DateTime<Local>) -> Duration {
    let into_hour = Duration::from_secs(u64::from(now.minute()) * 60 + u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond().min(999_999_999)));
    HOUR.saturating_sub(into_hour)
}

/// Re-initializes the logger at every top of the hour.
pub struct RotationScheduler<C = SystemClock> {
    logger: Logger,
    clock: C,
    ctx: Context,
}

impl RotationScheduler<SystemClock> {
    pub fn new(logger: Logger) -> Self {
        Self::with_clock(logger, SystemClock)
    }
}

impl<C: Clock> RotationScheduler<C> {
    pub fn with_clock(logger: Logger, clock: C) -> Self {
        Self {
            logger,
            clock,
            ctx: Context::background().with_correlation_id("ctxlog"),
        }
    }

    /// Install a pipeline on freshly named files and return their paths.
    pub fn rotate(&self, first: bool) -> (PathBuf, PathBuf) {
        let settings = self.logger.settings();
        let (info, error) = rotation_paths(&settings, self.clock.now(), first);

        self.logger.initialize(&info, &error, settings.level);
        metrics::record_rotation();

        crate::__emit!(
            &self.logger,
            &self.ctx,
            crate::facade::CallSite::caller(),
            Severity::Debug,
            "ctxlog",
            tracing::Level::DEBUG,
            "log files rotated",
            info = %info.display(),
            error = %error.display()
        );
        (info, error)
    }

    /// Rotate once synchronously, then keep rotating hourly in the background.
    ///
    /// Runs on the current tokio runtime when there is one, on a dedicated
    /// thread otherwise.
    pub fn start(self) -> RotationTask {
        self.rotate(true);
        self.spawn()
    }

    /// Start the hourly loop without an initial rotation.
    pub fn spawn(self) -> RotationTask {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => RotationTask::Task(runtime.spawn(self.run())),
            Err(_) => self.spawn_thread(),
        }
    }

    /// Start the hourly loop on a dedicated thread, independent of any runtime.
    pub fn spawn_thread(self) -> RotationTask {
        let (stop, stopped) = mpsc::channel();
        let keep_open = stop.clone();
        let spawned = thread::Builder::new()
            .name("ctxlog-rotation".to_string())
            .spawn(move || {
                let _keep_open = keep_open;
                self.run_blocking(stopped)
            });

        match spawned {
            Ok(handle) => RotationTask::Thread {
                handle: Some(handle),
                stop,
            },
            Err(e) => {
                eprintln!("ctxlog: cannot start rotation thread: {e}");
                RotationTask::Thread { handle: None, stop }
            }
        }
    }

    async fn run(self) {
        loop {
            tokio::time::sleep(until_next_hour(self.clock.now())).await;
            self.rotate(false);
        }
    }

    fn run_blocking(self, stopped: mpsc::Receiver<()>) {
        loop {
            match stopped.recv_timeout(until_next_hour(self.clock.now())) {
                Err(RecvTimeoutError::Timeout) => {
                    self.rotate(false);
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

/// Handle to a running rotation loop.
#[derive(Debug)]
pub enum RotationTask {
    /// Loop running as a task on a tokio runtime.
    Task(JoinHandle<()>),
    /// Loop running on its own thread. `handle` is `None` if the thread
    /// could not be spawned.
    Thread {
        handle: Option<thread::JoinHandle<()>>,
        stop: Sender<()>,
    },
}

impl RotationTask {
    /// Stop the loop. A rotation already underway completes.
    pub fn abort(&self) {
        match self {
            RotationTask::Task(handle) => handle.abort(),
            RotationTask::Thread { stop, .. } => {
                let _ = stop.send(());
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            RotationTask::Task(handle) => handle.is_finished(),
            RotationTask::Thread { handle, .. } => handle.as_ref().map_or(true, |h| h.is_finished()),
        }
    }
}
