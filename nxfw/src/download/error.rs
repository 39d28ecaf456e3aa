//! Bulk fetch errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching planned content.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Could not create the destination folder.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to download a file.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The file on disk does not hash to the manifest's value.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The external download tool is not installed.
    #[error("{tool} not found")]
    ToolMissing { tool: String },

    /// The external download tool reported a failure.
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// The PEM bundle does not hold a usable certificate and key.
    #[error("invalid client identity {}: {reason}", path.display())]
    InvalidIdentity { path: PathBuf, reason: String },

    /// Failed to set up the HTTP client.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// One or more jobs did not complete.
    #[error("{} download(s) failed: {}", files.len(), files.join(", "))]
    Failed { files: Vec<String> },
}
