//! Recursive title graph resolution.
//!
//! Starting from the system update title, every referenced title's manifest
//! is fetched and decoded, and every content blob it lists is queued for
//! download exactly once.
//!
//! # Walk
//!
//! ```text
//! resolve(0100000000000816, v, update)
//!     ├── lookup + decode  → TitleRef table
//!     ├── resolve(title A, vA, regular) → ContentRef table → queue blobs
//!     ├── resolve(title B, vB, regular) → ContentRef table → queue blobs
//!     └── ...
//! ```
//!
//! Each `(title, version, update-flag)` key is fetched at most once per run,
//! which also makes the walk terminate on graphs that reference a title
//! twice. Depth and total-title ceilings bound the walk when the remote
//! graph is not well formed.

mod error;
mod state;

pub use error::ResolveError;
pub use state::ResolutionState;

use std::path::{Path, PathBuf};

use crate::manifest::{self, ContentRef, ManifestEntries, TitleRef};
use crate::plan::{DownloadJob, DownloadPlan, MarkerState};
use crate::source::{ManifestSource, SourceError};
use crate::title::{TitleId, TitleVersion};
use crate::version::PackedVersion;

/// Default recursion ceiling. System updates only nest one level.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Default ceiling on distinct titles fetched in one run.
pub const DEFAULT_MAX_TITLES: usize = 4096;

/// Walk ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveLimits {
    pub max_depth: usize,
    pub max_titles: usize,
}

impl Default for ResolveLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_titles: DEFAULT_MAX_TITLES,
        }
    }
}

/// Resolver for one run. Dropping it drops the run's state.
pub struct TitleGraphResolver<S: ManifestSource> {
    source: S,
    destination: PathBuf,
    limits: ResolveLimits,
    state: ResolutionState,
}

impl<S: ManifestSource> TitleGraphResolver<S> {
    /// Create a resolver writing jobs for `destination`.
    pub fn new(source: S, destination: impl Into<PathBuf>) -> Self {
        Self {
            source,
            destination: destination.into(),
            limits: ResolveLimits::default(),
            state: ResolutionState::new(),
        }
    }

    pub fn with_limits(mut self, limits: ResolveLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn plan(&self) -> &DownloadPlan {
        &self.state.plan
    }

    /// Consume the resolver and return its plan.
    pub fn finish(self) -> DownloadPlan {
        self.state.plan
    }

    /// Resolve a title and everything it references.
    ///
    /// Re-resolving a key already visited in this run is a no-op.
    pub fn resolve(
        &mut self,
        title_id: TitleId,
        version: PackedVersion,
        is_update: bool,
    ) -> Result<(), ResolveError> {
        self.resolve_at(TitleVersion::new(title_id, version, is_update), 0)
    }

    fn resolve_at(&mut self, key: TitleVersion, depth: usize) -> Result<(), ResolveError> {
        if self.state.is_visited(&key) {
            tracing::trace!(title = %key, "already resolved");
            return Ok(());
        }
        if depth > self.limits.max_depth {
            return Err(ResolveError::TooDeep {
                title: key,
                max_depth: self.limits.max_depth,
            });
        }
        if self.state.visited_count() >= self.limits.max_titles {
            return Err(ResolveError::TooManyTitles {
                title: key,
                max_titles: self.limits.max_titles,
            });
        }
        self.state.mark_visited(key);

        let lookup = match self.source.lookup(&key) {
            Ok(lookup) => lookup,
            Err(SourceError::NotFound { .. }) => {
                tracing::info!(title = %key, "title not found, skipping");
                if key.title_id == TitleId::SYSTEM_VERSION_EXFAT {
                    self.state.plan.exfat = MarkerState::Absent;
                }
                return Ok(());
            }
            Err(source) => return Err(ResolveError::Source { title: key, source }),
        };

        self.state.plan.push(lookup.container);

        let manifest = manifest::decode(&lookup.bytes)
            .map_err(|source| ResolveError::Decode { title: key, source })?;
        tracing::debug!(
            title = %key,
            content_id = %lookup.content_id,
            entries = manifest.entries.len(),
            "manifest decoded"
        );

        match (key.is_update, manifest.entries) {
            (true, ManifestEntries::Titles(titles)) => self.resolve_titles(titles, depth),
            (false, ManifestEntries::Contents(contents)) => {
                self.queue_contents(&key, contents);
                Ok(())
            }
            (_, entries) => {
                tracing::warn!(
                    title = %key,
                    meta_type = manifest.header.meta_type,
                    entries = entries.len(),
                    "manifest layout does not match lookup kind, ignoring entries"
                );
                Ok(())
            }
        }
    }

    fn resolve_titles(&mut self, titles: Vec<TitleRef>, depth: usize) -> Result<(), ResolveError> {
        for title in titles {
            // Update manifests only ever reference regular titles.
            self.resolve_at(TitleVersion::new(title.title_id, title.version, false), depth + 1)?;
        }
        Ok(())
    }

    fn queue_contents(&mut self, key: &TitleVersion, contents: Vec<ContentRef>) {
        for content in contents {
            if key.title_id == TitleId::SYSTEM_VERSION_FAT {
                self.state.plan.fat = MarkerState::Found(content.content_id.clone());
            } else if key.title_id == TitleId::SYSTEM_VERSION_EXFAT {
                self.state.plan.exfat = MarkerState::Found(content.content_id.clone());
            }

            if self.state.queue_content(&content.content_id) {
                let job = DownloadJob::content(
                    self.source.content_url(&content.content_id),
                    &self.destination,
                    &content.content_id,
                    content.hash,
                );
                self.state.plan.push(job);
            } else {
                tracing::trace!(content_id = %content.content_id, "content already queued");
            }
        }
    }
}
