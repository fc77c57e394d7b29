//! Shared logging setup for Temporal Viewer binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "tempview=info,tempview_core=info,tempview_db=info";
const VERBOSE_LOG_FILTER: &str = "tempview=debug,tempview_core=debug,tempview_db=debug";

/// Logging configuration shared by Temporal Viewer binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Initialize tracing with a daily rolling log file and stderr output.
///
/// `RUST_LOG` overrides both filters. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
pub fn init_logging(config: LogConfig<'_>) -> Result<WorkerGuard> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let appender = tracing_appender::rolling::daily(&log_dir, format!("{}.log", config.app_name));
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let default_filter = if config.verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Get the Temporal Viewer home directory: ~/.tempview
pub fn tempview_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("TEMPVIEW_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tempview")
}

/// Get the logs directory: ~/.tempview/logs
pub fn logs_dir() -> PathBuf {
    tempview_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_override() {
        std::env::set_var("TEMPVIEW_HOME", "/tmp/tempview-test-home");
        assert_eq!(tempview_home(), PathBuf::from("/tmp/tempview-test-home"));
        assert_eq!(logs_dir(), PathBuf::from("/tmp/tempview-test-home/logs"));
        std::env::remove_var("TEMPVIEW_HOME");
    }
}
