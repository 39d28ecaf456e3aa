//! Manifest decoding errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The buffer ends before the header or the declared entry table does.
    #[error("manifest truncated: need {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    /// Failed to read a manifest file from disk.
    #[error("failed to read manifest {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },
}
