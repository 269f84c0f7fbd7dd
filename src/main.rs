//! ctxlog demo
//!
//! Emits a handful of records through the global logger so the file layout
//! and the console format can be inspected by hand.
//!
//! ```text
//! ctxlog-demo [--config ctxlog.toml] [--level warn] [--requests 3] [--watch]
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

use ctxlog::{Context, Settings, Severity};

#[derive(Parser)]
#[command(name = "ctxlog-demo")]
#[command(about = "Emit sample records through ctxlog", long_about = None)]
struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the minimum level from the settings file.
    #[arg(short, long)]
    level: Option<Severity>,

    /// Number of simulated requests.
    #[arg(short, long, default_value_t = 3)]
    requests: u32,

    /// Keep running and reload the settings file on change (Ctrl-C to stop).
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => ctxlog::load_settings(path)?,
        None => Settings::default(),
    };
    if let Some(level) = cli.level {
        settings.level = level;
    }

    ctxlog::init(settings);
    let logger = ctxlog::global();
    let startup = Context::background().with_correlation_id("startup");

    let current = logger.current();
    ctxlog::info!(&startup, "ctxlog-demo starting",
        level = %logger.min_level(),
        info_file = ?current.info_path(),
        error_file = ?current.error_path());

    for n in 0..cli.requests {
        let ctx = Context::background().with_new_correlation_id();
        handle_request(&ctx, n);
    }

    let ctx = Context::background().with_new_correlation_id();
    ctxlog::recover(logger, &ctx, || {
        ctxlog::panic!(&ctx, "simulated invariant violation", slot = 7)
    });

    if cli.watch {
        if let Some(path) = &cli.config {
            let (watcher, updates) = ctxlog::SettingsWatcher::new(path, logger.clone());
            let _watcher = watcher.run()?;
            tokio::spawn(ctxlog::config::apply_updates(logger.clone(), updates));

            ctxlog::info!(&startup, "watching settings file", path = %path.display());
            tokio::signal::ctrl_c().await?;
        } else {
            ctxlog::warn!(&startup, "--watch needs --config, exiting");
        }
    }

    ctxlog::info!(&startup, "ctxlog-demo done");
    logger.flush();
    Ok(())
}

fn handle_request(ctx: &Context, n: u32) {
    let start = Instant::now();
    ctxlog::info!(ctx, "request received", request = n);

    if n % 3 == 2 {
        ctxlog::warn!(ctx, "slow upstream", request = n, upstream = %"billing");
    }

    let elapsed = start.elapsed() + Duration::from_millis(u64::from(n) * 5);
    ctxlog::info!(ctx, "request served", request = n, took_ms = ctxlog::millis(elapsed));
}
