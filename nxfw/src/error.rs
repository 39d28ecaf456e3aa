//! Top-level error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::device::DeviceError;
use crate::download::FetchError;
use crate::logging::LoggingError;
use crate::manifest::ManifestError;
use crate::resolver::ResolveError;
use crate::source::{HttpError, SourceError};
use crate::version::VersionError;

/// Errors that can end a firmware run.
#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("invalid version: {0}")]
    Version(#[from] VersionError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Missing input file (certificate, keys).
    #[error("{what} not found: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] HttpError),

    /// Latest-version lookup and other direct CDN queries.
    #[error("{0}")]
    Meta(#[from] SourceError),

    #[error("{0}")]
    Manifest(#[from] ManifestError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Files the plan expected but that are not on disk.
    #[error("{} file(s) missing after download: {}", .0.len(), display_paths(.0))]
    MissingFiles(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type FirmwareResult<T> = Result<T, FirmwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_display() {
        let err = FirmwareError::MissingFiles(vec![
            PathBuf::from("Firmware 17.0.0/a.nca"),
            PathBuf::from("Firmware 17.0.0/b.nca"),
        ]);
        assert_eq!(
            err.to_string(),
            "2 file(s) missing after download: Firmware 17.0.0/a.nca, Firmware 17.0.0/b.nca"
        );
    }

    #[test]
    fn test_from_version_error() {
        let err: FirmwareError = "x.y".parse::<crate::version::PackedVersion>().unwrap_err().into();
        assert!(matches!(err, FirmwareError::Version(_)));
    }
}
