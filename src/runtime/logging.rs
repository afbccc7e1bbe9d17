use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSettings;

fn env_filter(log: &LogSettings) -> EnvFilter {
    let default = log.level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var("WAVES_LOG")
        .from_env_lossy()
}

/// Log to stderr; used by the one-shot subcommands.
pub fn init_stderr(log: &LogSettings) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter(log))
        .try_init()
        .context("failed to install log subscriber")
}

/// Log to `path`; the TUI owns the terminal so nothing may go to stderr.
pub fn init_file(log: &LogSettings, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(env_filter(log))
        .try_init()
        .context("failed to install log subscriber")
}
