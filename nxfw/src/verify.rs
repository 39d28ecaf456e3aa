//! Post-fetch completion check.

use std::path::PathBuf;

use crate::plan::DownloadPlan;

/// Check that every file named by the plan exists on disk.
///
/// Every job is checked; the error lists all missing paths in plan order.
/// Checksums are not re-verified here, that is the fetcher's job.
pub fn verify(plan: &DownloadPlan) -> Result<(), Vec<PathBuf>> {
    let missing: Vec<PathBuf> = plan
        .jobs()
        .iter()
        .map(|job| job.path())
        .filter(|path| {
            let present = path.is_file();
            if !present {
                tracing::error!(path = %path.display(), "download missing");
            }
            !present
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
