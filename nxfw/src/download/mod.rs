//! Bulk fetching of planned content.
//!
//! Once resolution has finished, every content job is independent. This
//! module hands the job list to a [`BulkFetcher`]:
//!
//! ```text
//! BulkFetcher (trait)
//!     ├── HttpFetcher  ── DownloadStrategy (Sequential | Parallel)
//!     │                       └── HttpDownloader (resume + SHA-256)
//!     ├── Aria2Fetcher ── external aria2c, input-file driven
//!     └── AutoFetcher  ── aria2c, falling back to HttpFetcher
//! ```

mod aria2;
mod checksum;
mod error;
mod fetcher;
mod http;
mod state;
mod strategy;

pub use aria2::Aria2Fetcher;
pub use checksum::{calculate_file_checksum, verify_checksum};
pub use error::FetchError;
pub use fetcher::{AutoFetcher, HttpFetcher};
pub use http::HttpDownloader;
pub use state::FetchState;
pub use strategy::{DownloadStrategy, ParallelStrategy, SequentialStrategy};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::plan::DownloadJob;

/// Default number of concurrent connections.
pub const DEFAULT_PARALLEL: usize = 16;

/// Progress callback: `(jobs_completed, jobs_total)`.
pub type FetchProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Fetches a finalised list of jobs.
///
/// Implementations own concurrency, retries and checksum verification, and
/// report a single pass/fail for the whole list.
pub trait BulkFetcher: Send + Sync {
    fn fetch(
        &self,
        jobs: &[DownloadJob],
        on_progress: Option<FetchProgressCallback>,
    ) -> Result<(), FetchError>;
}

/// Which fetcher to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetcherKind {
    /// aria2c when installed, the built-in fetcher otherwise.
    #[default]
    Auto,
    Aria2,
    Builtin,
}

impl FetcherKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Aria2 => "aria2",
            Self::Builtin => "builtin",
        }
    }
}

impl fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "aria2" | "aria2c" => Ok(Self::Aria2),
            "builtin" | "http" => Ok(Self::Builtin),
            other => Err(format!(
                "unknown fetcher '{}', expected auto, aria2 or builtin",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_kind_parse() {
        assert_eq!("auto".parse::<FetcherKind>().unwrap(), FetcherKind::Auto);
        assert_eq!("ARIA2C".parse::<FetcherKind>().unwrap(), FetcherKind::Aria2);
        assert_eq!("builtin".parse::<FetcherKind>().unwrap(), FetcherKind::Builtin);
        assert!("curl".parse::<FetcherKind>().is_err());
    }

    #[test]
    fn test_fetcher_kind_display_round_trips() {
        for kind in [FetcherKind::Auto, FetcherKind::Aria2, FetcherKind::Builtin] {
            assert_eq!(kind.to_string().parse::<FetcherKind>().unwrap(), kind);
        }
    }
}
