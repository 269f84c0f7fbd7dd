//! Leveled, structured logging with per-request correlation ids.
//!
//! Records are routed to two hourly-rotated files (an info file and an
//! error file, human-readable) and to stdout as JSON. Every record carries
//! the correlation id found in the caller's [`Context`] and the call site.
//!
//! ```no_run
//! use ctxlog::{Context, Settings};
//!
//! fn main() {
//!     ctxlog::init(Settings::default());
//!
//!     let ctx = Context::background().with_new_correlation_id();
//!     ctxlog::info!(&ctx, "request served", status = 200);
//! }
//! ```

pub mod config;
pub mod context;
pub mod encoder;
pub mod error;
pub mod facade;
pub mod level;
pub mod logger;
pub mod observability;
pub mod pipeline;
pub mod recover;
pub mod rotation;
pub mod sink;

pub use config::{load_settings, Settings, SettingsWatcher};
pub use context::{attach_new_correlation_id, read_correlation_id, Context};
pub use encoder::millis;
pub use error::{Error, Result};
pub use facade::CallSite;
pub use level::Severity;
pub use logger::{global, global_rotation, set_global, Logger};
pub use pipeline::Pipeline;
pub use recover::{recover, recover_future};
pub use rotation::{RotationScheduler, RotationTask};
pub use sink::{make_rotating_sink, MemorySink, RotatingSink, SinkPolicy};

#[doc(hidden)]
pub use tracing as __tracing;

/// Apply `settings` to the global logger and make sure it rotates hourly.
///
/// Works with or without a tokio runtime. Returns the info and error paths
/// of the startup files, which are installed before this returns. Calling
/// it again re-targets the files; the hourly loop is only started once.
pub fn init(settings: Settings) -> (std::path::PathBuf, std::path::PathBuf) {
    let global = global();
    global.replace_settings(settings);
    logger::ensure_global_rotation(global);
    RotationScheduler::new(global.clone()).rotate(true)
}
