//! Download plan produced by title resolution.
//!
//! The plan is an ordered list of [`DownloadJob`]s plus the two SystemVersion
//! marker slots. Manifest containers are fetched inline during resolution;
//! content jobs are handed to a bulk fetcher afterwards.

use std::fmt;
use std::path::{Path, PathBuf};

/// What a job downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// A manifest container (`.cnmt.nca`), fetched during resolution.
    Manifest,
    /// A content blob (`.nca`), fetched by the bulk fetcher.
    Content,
}

/// One file to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    pub directory: PathBuf,
    pub filename: String,
    /// Expected SHA-256 (lower-case hex). Manifest containers carry none.
    pub checksum: Option<String>,
    pub kind: JobKind,
}

impl DownloadJob {
    /// Job for a manifest container; no integrity hash is known.
    pub fn manifest(url: impl Into<String>, directory: &Path, content_id: &str) -> Self {
        Self {
            url: url.into(),
            directory: directory.to_path_buf(),
            filename: format!("{}.cnmt.nca", content_id),
            checksum: None,
            kind: JobKind::Manifest,
        }
    }

    /// Job for a content blob with its expected hash.
    pub fn content(
        url: impl Into<String>,
        directory: &Path,
        content_id: &str,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            directory: directory.to_path_buf(),
            filename: format!("{}.nca", content_id),
            checksum: Some(checksum.into()),
            kind: JobKind::Content,
        }
    }

    /// Destination path (`directory/filename`).
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    pub fn is_content(&self) -> bool {
        self.kind == JobKind::Content
    }
}

/// Discovery state of a SystemVersion marker title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MarkerState {
    /// Not seen yet in this run.
    #[default]
    Pending,
    /// The CDN reported the title as not found.
    Absent,
    /// Content id of the marker's blob.
    Found(String),
}

impl MarkerState {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn content_id(&self) -> Option<&str> {
        match self {
            Self::Found(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for MarkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(id) => write!(f, "{}.nca", id),
            Self::Pending | Self::Absent => f.write_str("Not Found"),
        }
    }
}

/// Ordered download plan for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct DownloadPlan {
    jobs: Vec<DownloadJob>,
    /// SystemVersion blob of the FAT firmware build.
    pub fat: MarkerState,
    /// SystemVersion blob of the exFAT firmware build.
    pub exfat: MarkerState,
}

impl DownloadPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. Deduplication is the resolver's responsibility.
    pub fn push(&mut self, job: DownloadJob) {
        self.jobs.push(job);
    }

    pub fn jobs(&self) -> &[DownloadJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Content jobs, in plan order.
    pub fn content_jobs(&self) -> Vec<DownloadJob> {
        self.jobs.iter().filter(|j| j.is_content()).cloned().collect()
    }

    /// Current length, to be passed to [`jobs_since`](Self::jobs_since) later.
    pub fn watermark(&self) -> usize {
        self.jobs.len()
    }

    /// Jobs appended after `mark`.
    pub fn jobs_since(&self, mark: usize) -> &[DownloadJob] {
        &self.jobs[mark.min(self.jobs.len())..]
    }

    /// Every path the plan is expected to produce.
    pub fn expected_paths(&self) -> Vec<PathBuf> {
        self.jobs.iter().map(DownloadJob::path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_paths() {
        let dir = Path::new("Firmware 17.0.0");
        let m = DownloadJob::manifest("https://x/c/s/aa", dir, "aa");
        let c = DownloadJob::content("https://x/c/c/bb", dir, "bb", "ff");

        assert_eq!(m.path(), dir.join("aa.cnmt.nca"));
        assert_eq!(m.checksum, None);
        assert!(!m.is_content());
        assert_eq!(c.path(), dir.join("bb.nca"));
        assert_eq!(c.checksum.as_deref(), Some("ff"));
    }

    #[test]
    fn test_watermark_and_jobs_since() {
        let dir = Path::new("out");
        let mut plan = DownloadPlan::new();
        plan.push(DownloadJob::content("u1", dir, "a", "1"));
        let mark = plan.watermark();
        plan.push(DownloadJob::manifest("u2", dir, "b"));
        plan.push(DownloadJob::content("u3", dir, "c", "3"));

        let since = plan.jobs_since(mark);
        assert_eq!(since.len(), 2);
        assert_eq!(since[0].filename, "b.cnmt.nca");
        assert!(plan.jobs_since(99).is_empty());
        assert_eq!(plan.content_jobs().len(), 2);
    }

    #[test]
    fn test_marker_display() {
        assert_eq!(MarkerState::Pending.to_string(), "Not Found");
        assert_eq!(MarkerState::Absent.to_string(), "Not Found");
        assert_eq!(MarkerState::Found("ab".into()).to_string(), "ab.nca");
        assert_eq!(MarkerState::Found("ab".into()).content_id(), Some("ab"));
    }
}
