//! Logging setup
//!
//! Logs go to stdout and, when the log directory is writable, to
//! `~/.cookalong/logs/cookalong.log`. `RUST_LOG` overrides the default
//! `info` filter.

use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "cookalong.log";

/// Format timestamps using the system's local time via chrono
struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Default log directory (~/.cookalong/logs)
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".cookalong").join("logs"))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(log_dir: &Path) -> Option<std::fs::File> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Could not create log directory {:?}: {}", log_dir, e);
        return None;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE_NAME))
        .ok()
}

/// Install the global subscriber
///
/// Falls back to stdout only when the log file cannot be opened. Calling
/// this a second time leaves the first subscriber in place.
pub fn init_logging(log_dir: &Path) {
    let stdout_layer = tracing_subscriber::fmt::layer().with_timer(LocalTimer);

    let result = match open_log_file(log_dir) {
        Some(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_timer(LocalTimer)
                .with_ansi(false);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(env_filter())
            .with(stdout_layer)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Logging already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_created() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");

        assert!(open_log_file(&log_dir).is_some());
        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_default_log_dir() {
        assert!(default_log_dir().ends_with(".cookalong/logs"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        init_logging(dir.path());
        init_logging(dir.path());
        tracing::info!("still logging");
    }
}
