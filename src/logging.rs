//! Tracing setup shared by the command-line tools.
//!
//! Each tool run logs to stderr and to `<tool>_<timestamp>.log` under the app
//! `logs` directory. The filter comes from `PHONATION_LOG` (default `info`).

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Environment variable holding the tracing filter directive.
pub const FILTER_ENV: &str = "PHONATION_LOG";
const DEFAULT_FILTER: &str = "info";
/// Log files kept per tool, newest first.
const RUNS_KEPT: usize = 10;
const LOG_EXTENSION: &str = "log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No app directory available for logs")]
    NoLogDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to prune old logs in {path}: {source}")]
    Prune {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to timestamp log file name: {0}")]
    Timestamp(time::error::Format),
    #[error("A global tracing subscriber is already installed: {0}")]
    Subscriber(tracing::subscriber::SetGlobalDefaultError),
}

/// Start logging for `tool` in the app `logs` directory.
///
/// Later calls in the same process are no-ops. An error leaves the caller
/// running without logs.
pub fn init(tool: &str) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir = app_dirs::logs_dir().map_err(|err| match err {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoLogDir,
        app_dirs::AppDirError::CreateDir { path, source } => LoggingError::LogDir { path, source },
    })?;
    init_in(tool, &log_dir)
}

/// Like [`init`] with log files placed in `log_dir`.
pub fn init_in(tool: &str, log_dir: &Path) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::LogDir {
        path: log_dir.to_path_buf(),
        source,
    })?;
    let file_name = run_file_name(tool, now())?;
    let log_path = log_dir.join(&file_name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|source| LoggingError::LogFile {
            path: log_path.clone(),
            source,
        })?;
    prune_runs(log_dir, tool, RUNS_KEPT)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(log_dir, file_name));
    let timer = timer();
    let filter = EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(timer.clone())
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer),
        );
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::Subscriber)?;
    let _ = LOG_GUARD.set(guard);

    tracing::debug!("{tool} logging to {}", log_path.display());
    Ok(())
}

fn run_file_name(tool: &str, started: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = started.format(STAMP).map_err(LoggingError::Timestamp)?;
    Ok(format!("{tool}_{stamp}.{LOG_EXTENSION}"))
}

/// Delete all but the newest `keep` run logs of `tool`.
///
/// Run logs sort chronologically by name; files of other tools are left alone.
fn prune_runs(dir: &Path, tool: &str, keep: usize) -> Result<(), LoggingError> {
    let prefix = format!("{tool}_");
    let prune_error = |source| LoggingError::Prune {
        path: dir.to_path_buf(),
        source,
    };
    let mut runs: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(prune_error)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension().and_then(|ext| ext.to_str()) == Some(LOG_EXTENSION)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| is_run_of(name, &prefix))
        })
        .collect();
    runs.sort();
    let excess = runs.len().saturating_sub(keep);
    for path in runs.into_iter().take(excess) {
        fs::remove_file(&path).map_err(prune_error)?;
    }
    Ok(())
}

// `phonation_` must not match `phonation-train_...`, so the rest has to start
// with the date.
fn is_run_of(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

fn timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY.into())
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn run_file_names_carry_tool_and_start_time() {
        let started = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            run_file_name("phonation-train", started).unwrap(),
            "phonation-train_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn pruning_keeps_the_newest_runs_of_one_tool() {
        let dir = tempdir().unwrap();
        for minute in 0..12 {
            let name = format!("phonation_2024-01-01_10-{minute:02}-00.log");
            fs::write(dir.path().join(name), "").unwrap();
        }
        let other_tool = dir.path().join("phonation-train_2023-01-01_00-00-00.log");
        fs::write(&other_tool, "").unwrap();
        fs::write(dir.path().join("results.csv"), "name\n").unwrap();

        prune_runs(dir.path(), "phonation", 10).unwrap();

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("phonation_"))
            .collect();
        left.sort();
        assert_eq!(left.len(), 10);
        assert_eq!(left[0], "phonation_2024-01-01_10-02-00.log");
        assert!(other_tool.exists());
        assert!(dir.path().join("results.csv").exists());
    }
}
