//! Download strategies for a batch of jobs.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use super::error::FetchError;
use super::http::HttpDownloader;
use super::state::FetchState;
use super::FetchProgressCallback;

/// Strategy for downloading a batch.
pub trait DownloadStrategy: Send + Sync {
    /// Download every job in `state`, recording successes and failures.
    ///
    /// Individual job failures are recorded in `state`, not returned.
    fn execute(
        &self,
        state: &mut FetchState,
        downloader: &HttpDownloader,
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError>;
}

/// Downloads jobs one at a time.
#[derive(Debug, Default)]
pub struct SequentialStrategy;

impl SequentialStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl DownloadStrategy for SequentialStrategy {
    fn execute(
        &self,
        state: &mut FetchState,
        downloader: &HttpDownloader,
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError> {
        let total = state.total();

        for i in 0..total {
            let job = &state.jobs[i];
            match downloader.download(&job.url, &job.path(), job.checksum.as_deref()) {
                Ok(bytes) => state.record_success(bytes),
                Err(e) => {
                    tracing::warn!(file = %job.filename, error = %e, "download failed");
                    state.record_failure(i);
                }
            }

            if let Some(ref cb) = on_progress {
                cb(state.completed, total);
            }
        }

        Ok(())
    }
}

/// Downloads jobs concurrently on a fixed pool of worker threads.
///
/// Workers pull the next job index from a shared counter, so one slow file
/// never holds up the rest of the batch.
#[derive(Debug)]
pub struct ParallelStrategy {
    /// Maximum number of concurrent downloads.
    pub concurrency: usize,
}

impl ParallelStrategy {
    /// Create a parallel strategy (minimum concurrency 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

impl Default for ParallelStrategy {
    fn default() -> Self {
        Self::new(super::DEFAULT_PARALLEL)
    }
}

impl DownloadStrategy for ParallelStrategy {
    fn execute(
        &self,
        state: &mut FetchState,
        downloader: &HttpDownloader,
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError> {
        let total = state.total();
        let next = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let bytes = AtomicU64::new(0);
        let failed = Mutex::new(Vec::new());
        let jobs = &state.jobs;

        thread::scope(|scope| {
            for _ in 0..self.concurrency.min(total) {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    let Some(job) = jobs.get(i) else {
                        break;
                    };

                    match downloader.download(&job.url, &job.path(), job.checksum.as_deref()) {
                        Ok(size) => {
                            bytes.fetch_add(size, Ordering::SeqCst);
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            if let Some(ref cb) = on_progress {
                                cb(done, total);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(file = %job.filename, error = %e, "download failed");
                            if let Ok(mut failed) = failed.lock() {
                                failed.push(i);
                            }
                        }
                    }
                });
            }
        });

        state.completed += completed.into_inner();
        state.bytes_downloaded += bytes.into_inner();
        state
            .failed
            .extend(failed.into_inner().unwrap_or_else(|e| e.into_inner()));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DownloadJob;
    use crate::source::ClientSettings;
    use std::path::Path;
    use std::time::Duration;

    fn downloader() -> HttpDownloader {
        HttpDownloader::new(&ClientSettings::default().with_timeout(Duration::from_secs(1)))
            .unwrap()
    }

    #[test]
    fn test_concurrency_is_kept() {
        assert_eq!(ParallelStrategy::new(8).concurrency, 8);
    }

    #[test]
    fn test_zero_concurrency_runs_one_worker() {
        assert_eq!(ParallelStrategy::new(0).concurrency, 1);
    }

    #[test]
    fn test_default_matches_cli_default() {
        assert_eq!(ParallelStrategy::default().concurrency, 16);
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let mut state = FetchState::new(Vec::new());
        ParallelStrategy::new(4)
            .execute(&mut state, &downloader(), None)
            .unwrap();
        SequentialStrategy::new()
            .execute(&mut state, &downloader(), None)
            .unwrap();
        assert!(state.is_complete());
    }

    #[test]
    fn test_unreachable_urls_are_all_recorded() {
        let temp = tempfile::TempDir::new().unwrap();
        // Port 9 (discard) on localhost refuses connections on test hosts.
        let jobs: Vec<_> = (0..3)
            .map(|i| {
                DownloadJob::content(
                    format!("http://127.0.0.1:9/{}", i),
                    temp.path(),
                    &format!("c{}", i),
                    "00",
                )
            })
            .collect();
        let mut state = FetchState::new(jobs);

        ParallelStrategy::new(2)
            .execute(&mut state, &downloader(), None)
            .unwrap();

        assert_eq!(state.completed, 0);
        assert_eq!(state.failed_files(), vec!["c0.nca", "c1.nca", "c2.nca"]);
        assert!(!Path::new(&temp.path().join("c0.nca")).exists());
    }
}
