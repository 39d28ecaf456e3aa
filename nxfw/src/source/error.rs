//! Manifest source errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::title::TitleVersion;

/// Errors returned by a [`ManifestSource`](super::ManifestSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote reports no such title/version. Not fatal to a run.
    #[error("title {title} not found")]
    NotFound { title: TitleVersion },

    /// Any other network or protocol failure.
    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The remote answered with something we could not interpret.
    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// The extractor could not produce a raw manifest.
    #[error("failed to extract manifest from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// Failed to write a downloaded container.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
