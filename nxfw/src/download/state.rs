//! Fetch state for a batch of jobs.

use crate::plan::DownloadJob;

/// Tracks progress and failures while a batch of jobs is fetched.
#[derive(Debug, Clone)]
pub struct FetchState {
    /// Jobs in this batch.
    pub jobs: Vec<DownloadJob>,
    /// Number of jobs completed.
    pub completed: usize,
    /// Total bytes on disk for completed jobs.
    pub bytes_downloaded: u64,
    /// Jobs that failed (by index).
    pub failed: Vec<usize>,
}

impl FetchState {
    pub fn new(jobs: Vec<DownloadJob>) -> Self {
        Self {
            jobs,
            completed: 0,
            bytes_downloaded: 0,
            failed: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    /// Check if every job completed.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total() && self.failed.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn record_success(&mut self, bytes: u64) {
        self.completed += 1;
        self.bytes_downloaded += bytes;
    }

    pub fn record_failure(&mut self, index: usize) {
        self.failed.push(index);
    }

    /// Get the failed indices and clear the failure list.
    pub fn take_failures(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.failed)
    }

    /// File names of failed jobs, in index order.
    pub fn failed_files(&self) -> Vec<String> {
        let mut failed = self.failed.clone();
        failed.sort_unstable();
        failed
            .into_iter()
            .filter_map(|i| self.jobs.get(i))
            .map(|job| job.filename.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn state(n: usize) -> FetchState {
        FetchState::new(
            (0..n)
                .map(|i| DownloadJob::content("u", Path::new("out"), &format!("c{}", i), "00"))
                .collect(),
        )
    }

    #[test]
    fn test_new_state() {
        let s = state(2);
        assert_eq!(s.total(), 2);
        assert_eq!(s.completed, 0);
        assert!(!s.is_complete());
    }

    #[test]
    fn test_is_complete() {
        let mut s = state(1);
        s.record_success(10);
        assert!(s.is_complete());
        assert_eq!(s.bytes_downloaded, 10);

        s.record_failure(0);
        assert!(!s.is_complete());
    }

    #[test]
    fn test_take_failures() {
        let mut s = state(1);
        s.record_failure(0);
        assert_eq!(s.take_failures(), vec![0]);
        assert!(!s.has_failures());
    }

    #[test]
    fn test_failed_files_sorted() {
        let mut s = state(3);
        s.record_failure(2);
        s.record_failure(0);
        assert_eq!(s.failed_files(), vec!["c0.nca", "c2.nca"]);
    }
}
