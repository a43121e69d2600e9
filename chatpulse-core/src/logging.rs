//! Logging for chatpulse
//!
//! The CLI writes to a daily-rolling file under `$XDG_STATE_HOME/chatpulse/`
//! (files named `chatpulse.log.YYYY-MM-DD`); the server logs to stdout and
//! only borrows [`filter_for`]. Every analysis emits a "Transcript parsed"
//! summary and a "Report assembled" event at `info`. Skipped records and
//! excluded names are logged at `debug`.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Prefix of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "chatpulse.log";

/// Install file logging in the XDG state directory.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    init_in(&Config::state_dir(), config)
}

/// Install file logging in `log_dir`.
///
/// Fails when the directory cannot be created or a global subscriber is
/// already set.
pub fn init_in(log_dir: &Path, config: &LoggingConfig) -> Result<LoggingGuard> {
    let appender = rolling_appender(log_dir, config.max_files)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter_for(config))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Level filter: `RUST_LOG` when set and valid, the configured level otherwise.
pub fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

fn rolling_appender(log_dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(max_files.max(1))
        .build(log_dir)
        .map_err(|e| Error::Config(format!("failed to open log file in {:?}: {}", log_dir, e)))
}

/// Route logs to the test writer. Safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Flushes buffered log lines when dropped. Hold it for the life of `main`.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Base path of the log files (the date suffix is added on rotation).
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path();
        assert!(path.ends_with(LOG_FILE_PREFIX));
    }

    #[test]
    fn test_rolling_appender_creates_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("state/chatpulse");

        let appender = rolling_appender(&log_dir, 0);

        assert!(appender.is_ok());
        assert!(log_dir.is_dir());
    }

    #[test]
    fn test_rolling_appender_rejects_file_path() {
        let temp_dir = TempDir::new().unwrap();
        let not_a_dir = temp_dir.path().join("plain-file");
        std::fs::write(&not_a_dir, b"x").unwrap();

        assert!(rolling_appender(&not_a_dir, 5).is_err());
    }

    #[test]
    fn test_init_test_is_repeatable() {
        init_test();
        init_test();
        tracing::debug!("still logging");
    }
}
