//! Bulk fetcher implementations.

use std::sync::Arc;

use super::aria2::Aria2Fetcher;
use super::error::FetchError;
use super::http::HttpDownloader;
use super::state::FetchState;
use super::strategy::{DownloadStrategy, ParallelStrategy, SequentialStrategy};
use super::{BulkFetcher, FetchProgressCallback};
use crate::plan::DownloadJob;

/// Built-in fetcher: resumable HTTP downloads on a worker pool.
///
/// Failed jobs are retried as a batch before the fetch is reported as
/// failed, and every file still missing after the last attempt is listed.
#[derive(Debug)]
pub struct HttpFetcher {
    downloader: HttpDownloader,
    parallel: usize,
    retries: usize,
}

impl HttpFetcher {
    pub fn new(downloader: HttpDownloader, parallel: usize) -> Self {
        Self {
            downloader,
            parallel: parallel.max(1),
            retries: 1,
        }
    }

    /// Number of extra passes over failed jobs.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn parallel(&self) -> usize {
        self.parallel
    }

    fn strategy(&self, jobs: usize) -> Box<dyn DownloadStrategy> {
        if self.parallel > 1 && jobs > 1 {
            Box::new(ParallelStrategy::new(self.parallel))
        } else {
            Box::new(SequentialStrategy::new())
        }
    }
}

impl BulkFetcher for HttpFetcher {
    fn fetch(
        &self,
        jobs: &[DownloadJob],
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let total = jobs.len();
        let mut state = FetchState::new(jobs.to_vec());
        self.strategy(total)
            .execute(&mut state, &self.downloader, on_progress.clone())?;

        let mut attempt = 0;
        while state.has_failures() && attempt < self.retries {
            attempt += 1;
            let retry: Vec<DownloadJob> = state
                .take_failures()
                .into_iter()
                .filter_map(|i| state.jobs.get(i).cloned())
                .collect();
            tracing::info!(count = retry.len(), attempt, "retrying failed downloads");

            let done = state.completed;
            let mut retry_state = FetchState::new(retry);
            let progress = on_progress.clone().map(|cb| -> FetchProgressCallback {
                Arc::new(move |completed: usize, _: usize| cb(done + completed, total))
            });
            self.strategy(retry_state.total())
                .execute(&mut retry_state, &self.downloader, progress)?;

            state.completed += retry_state.completed;
            state.bytes_downloaded += retry_state.bytes_downloaded;
            state.failed = remap_failures(&state.jobs, &retry_state);
        }

        if state.has_failures() {
            return Err(FetchError::Failed {
                files: state.failed_files(),
            });
        }

        tracing::debug!(
            files = state.completed,
            bytes = state.bytes_downloaded,
            "bulk fetch complete"
        );
        Ok(())
    }
}

/// Map failure indices of a retry batch back onto the original job list.
fn remap_failures(jobs: &[DownloadJob], retry: &FetchState) -> Vec<usize> {
    retry
        .failed
        .iter()
        .filter_map(|&i| retry.jobs.get(i))
        .filter_map(|failed| jobs.iter().position(|job| job == failed))
        .collect()
}

/// Uses aria2c when it is installed, the built-in fetcher otherwise.
#[derive(Debug)]
pub struct AutoFetcher {
    aria2: Aria2Fetcher,
    fallback: HttpFetcher,
}

impl AutoFetcher {
    pub fn new(aria2: Aria2Fetcher, fallback: HttpFetcher) -> Self {
        Self { aria2, fallback }
    }
}

impl BulkFetcher for AutoFetcher {
    fn fetch(
        &self,
        jobs: &[DownloadJob],
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError> {
        match self.aria2.fetch(jobs, on_progress.clone()) {
            Err(FetchError::ToolMissing { tool }) => {
                tracing::info!(%tool, "external downloader not installed, using built-in fetcher");
                self.fallback.fetch(jobs, on_progress)
            }
            other => other,
        }
    }
}
