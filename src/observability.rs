// SPDX-License-Identifier: Apache-2.0

//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "tablechat.log";
const LOG_RETENTION_DAYS: u64 = 14;
const DEFAULT_FILTER: &str = "tablechat=info,tablechat_lib=info";

/// Install the JSON file subscriber and the panic hook.
///
/// Logs go to `log_dir` when given, otherwise to the per-user default
/// directory. Returns the directory actually used.
pub fn init_tracing(log_dir: Option<&Path>) -> PathBuf {
    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(log_directory);
    let _ = fs::create_dir_all(&log_dir);

    if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("PANIC: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("PANIC: {}", s)
        } else {
            "PANIC: unknown cause".to_string()
        };

        tracing::error!(target: "panic", location = %location, message = %msg, "tablechat panicked");
        previous_hook(panic_info);
    }));

    tracing::info!(log_dir = ?log_dir, "Tracing initialized");
    log_dir
}

fn log_directory() -> PathBuf {
    match dirs::data_local_dir() {
        Some(mut path) => {
            path.push("tablechat");
            path.push("logs");
            path
        }
        None => PathBuf::from(".tablechat").join("logs"),
    }
}

/// Remove `*.log*` files in `log_dir` older than `retention_days`.
///
/// Returns the number of files removed.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();

        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX) || name.ends_with(".log"))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if let Some(age) = age {
            if age > retention {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
                }
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_keeps_fresh_logs_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tablechat.log.2026-10-18"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let removed = cleanup_old_logs(dir.path(), LOG_RETENTION_DAYS).unwrap();
        assert_eq!(removed, 0);
        assert!(dir.path().join("tablechat.log.2026-10-18").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn cleanup_with_zero_retention_removes_logs_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tablechat.log.2026-10-01"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let removed = cleanup_old_logs(dir.path(), 0).unwrap();
        assert_eq!(removed, 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
