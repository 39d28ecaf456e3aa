//! Manifest extraction from downloaded containers.
//!
//! Containers are encrypted; decrypting them is left to `hactool`, which
//! writes the section 0 filesystem (holding a single `*.cnmt`) to a private
//! scratch directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::error::SourceError;

/// Produces raw manifest bytes from a container on disk.
pub trait ManifestExtractor: Send + Sync {
    fn extract(&self, container: &Path) -> Result<Vec<u8>, SourceError>;
}

/// Default tool name for the current platform.
pub fn default_hactool() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("hactool.exe")
    } else {
        PathBuf::from("./hactool")
    }
}

/// Shell-based extractor using `hactool`.
#[derive(Debug, Clone)]
pub struct HactoolExtractor {
    tool: PathBuf,
    keys: PathBuf,
    work_dir: PathBuf,
}

impl HactoolExtractor {
    /// Create an extractor using `tool` and the key file `keys`.
    pub fn new(tool: impl Into<PathBuf>, keys: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            keys: keys.into(),
            work_dir: std::env::temp_dir(),
        }
    }

    /// Directory under which scratch output is created.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn keys(&self) -> &Path {
        &self.keys
    }

    /// Fresh mode-0700 directory, removed when the handle drops.
    fn scratch_dir(&self, container: &Path) -> Result<tempfile::TempDir, SourceError> {
        tempfile::Builder::new()
            .prefix("nxfw-cnmt-")
            .tempdir_in(&self.work_dir)
            .map_err(|e| SourceError::Extraction {
                path: container.to_path_buf(),
                reason: format!(
                    "failed to create scratch directory in {}: {}",
                    self.work_dir.display(),
                    e
                ),
            })
    }
}

impl ManifestExtractor for HactoolExtractor {
    fn extract(&self, container: &Path) -> Result<Vec<u8>, SourceError> {
        let scratch_dir = self.scratch_dir(container)?;
        let scratch = scratch_dir.path();

        let output = Command::new(&self.tool)
            .arg("-k")
            .arg(&self.keys)
            .arg(container)
            .arg("--section0dir")
            .arg(scratch)
            .output()
            .map_err(|e| SourceError::Extraction {
                path: container.to_path_buf(),
                reason: format!("failed to run {}: {}", self.tool.display(), e),
            })?;

        // hactool reports some failures with a zero exit code, so the
        // presence of the cnmt is what decides success.
        let result = read_single_cnmt(scratch).map_err(|reason| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            SourceError::Extraction {
                path: container.to_path_buf(),
                reason: if stderr.trim().is_empty() {
                    reason
                } else {
                    format!("{} ({})", reason, stderr.trim())
                },
            }
        });

        let scratch_path = scratch.to_path_buf();
        if let Err(e) = scratch_dir.close() {
            tracing::warn!(path = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }

        result
    }
}

/// Read the first `*.cnmt` file in `dir`.
fn read_single_cnmt(dir: &Path) -> Result<Vec<u8>, String> {
    let pattern = format!(
        "{}/*.cnmt",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let first = glob::glob(&pattern)
        .map_err(|e| format!("bad glob pattern: {}", e))?
        .filter_map(Result::ok)
        .next()
        .ok_or_else(|| format!("no .cnmt produced in {}", dir.display()))?;

    fs::read(&first).map_err(|e| format!("failed to read {}: {}", first.display(), e))
}
