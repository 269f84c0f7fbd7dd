//! Settings file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_settings;
use crate::config::schema::Settings;
use crate::context::Context;
use crate::error::Result;
use crate::logger::Logger;

/// A watcher that reloads the settings file when it changes.
pub struct SettingsWatcher {
    path: PathBuf,
    logger: Logger,
    update_tx: mpsc::UnboundedSender<Settings>,
}

impl SettingsWatcher {
    /// Create a new SettingsWatcher reporting through `logger`.
    ///
    /// Returns the watcher and a receiver for reloaded settings.
    pub fn new(path: &Path, logger: Logger) -> (Self, mpsc::UnboundedReceiver<Settings>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                logger,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let logger = self.logger.clone();
        let ctx = Context::background().with_correlation_id("ctxlog");

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        match load_settings(&path) {
                            Ok(settings) => {
                                crate::info!(logger: &logger, &ctx, "settings reloaded",
                                    path = %path.display());
                                let _ = tx.send(settings);
                            }
                            Err(e) => {
                                crate::error!(logger: &logger, &ctx,
                                    "settings reload failed, keeping current settings",
                                    error = %e);
                            }
                        }
                    }
                }
                Err(e) => {
                    crate::error!(logger: &logger, &ctx, "settings watch error", error = %e);
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }
}

/// Apply every reloaded settings value to `logger` until the channel closes.
pub async fn apply_updates(logger: Logger, mut updates: mpsc::UnboundedReceiver<Settings>) {
    while let Some(settings) = updates.recv().await {
        logger.apply_settings(settings);
    }
}
