//! File logging setup.
//!
//! Logs go to a daily-rolling file under `$CHATLINE_HOME/logs` so the
//! inline painter owns the terminal. Filter precedence: `RUST_LOG`, then
//! the config's `log_level`, then the `-v` count.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "chatline.log";

/// Maps a `-v` count to a default filter directive.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Builds the effective filter.
fn build_filter(configured: Option<&str>, verbosity: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    // An explicit -v wins over the config file.
    let directive = match configured.map(str::trim).filter(|s| !s.is_empty()) {
        Some(level) if verbosity == 0 => level,
        _ => level_for_verbosity(verbosity),
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber writing to `dir`.
///
/// The returned guard flushes buffered records on drop; keep it alive for
/// the whole process.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(dir: &Path, configured: Option<&str>, verbosity: u8) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        )
        .with(build_filter(configured, verbosity))
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::debug!(dir = %dir.display(), "file logging initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity(0), "info");
        assert_eq!(level_for_verbosity(1), "debug");
        assert_eq!(level_for_verbosity(5), "trace");
    }

    #[test]
    fn test_init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("nested").join("logs");

        // A subscriber may already be installed by another test in this
        // binary; the directory must exist either way.
        let _ = init(&logs, Some("debug"), 0);
        assert!(logs.is_dir());
    }
}
