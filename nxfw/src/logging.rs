//! Logging setup.
//!
//! Log lines go to stderr (stdout carries the command's own output) and,
//! optionally, to a file through a non-blocking writer. The returned
//! [`LoggingGuard`] must be held until exit so buffered file output is
//! flushed.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "nxfw=info,nxfw_cli=info";

/// Filter used with `--verbose`.
pub const VERBOSE_FILTER: &str = "nxfw=debug,nxfw_cli=debug";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("log file path has no file name: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("failed to install logger: {0}")]
    Init(String),
}

/// Keeps the file writer alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `verbose` overrides `RUST_LOG` with debug output for this crate.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<LoggingGuard, LoggingError> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::new(Rfc3339))
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            fs::create_dir_all(&dir).map_err(|e| LoggingError::CreateDirFailed {
                path: dir.clone(),
                source: e,
            })?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_timer(LocalTime::new(Rfc3339))
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Split a log path into (directory, file name).
fn split_log_path(path: &Path) -> Result<(PathBuf, PathBuf), LoggingError> {
    let name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("logs/nxfw.log")).unwrap();
        assert_eq!(dir, PathBuf::from("logs"));
        assert_eq!(name, PathBuf::from("nxfw.log"));
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, name) = split_log_path(Path::new("nxfw.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, PathBuf::from("nxfw.log"));
    }

    #[test]
    fn test_split_rejects_directory_only() {
        assert!(matches!(
            split_log_path(Path::new("/")),
            Err(LoggingError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_verbose_filter_enables_debug() {
        assert!(env_filter(true).to_string().contains("nxfw=debug"));
    }
}
