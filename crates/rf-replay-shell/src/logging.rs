//! Logger configuration for the CLI binary. Mirrors the teacher's own
//! `shell` crate logging setup, swapped to this crate's log file names.

use std::path::PathBuf;

use ftlog::appender::{FileAppender, Period};
use ftlog::{LevelFilter, LoggerGuard};

/// Configures `ftlog`, creating `./logs/` if needed.
///
/// # Errors
///
/// Returns a message if the logs directory can't be created or the logger
/// can't be initialized.
pub fn configure_logger(file_name: &str) -> Result<(LoggerGuard, PathBuf), String> {
    let root_dir = PathBuf::from(".").canonicalize().map_err(|e| e.to_string())?;
    let logs_dir = root_dir.join("logs");
    if !logs_dir.exists() {
        std::fs::create_dir(&logs_dir).map_err(|e| e.to_string())?;
    }
    let log_path = logs_dir.join(file_name);

    let writer = FileAppender::builder().path(&log_path).rotate(Period::Day).build();

    let err_stem = log_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "log file name has no stem".to_string())?;
    let err_path = log_path.with_file_name(format!("{err_stem}-err"));

    let guard = ftlog::Builder::new()
        .max_log_level(LevelFilter::Info)
        .root(writer)
        .filter("ftlog::appender", "ftlog-appender", LevelFilter::Warn)
        .appender("ftlog-appender", FileAppender::new(err_path))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok((guard, log_path))
}
