//! Per-run resolution state.

use std::collections::HashSet;

use crate::plan::DownloadPlan;
use crate::title::TitleVersion;

/// Everything one resolution run accumulates.
#[derive(Debug, Default)]
pub struct ResolutionState {
    visited_titles: HashSet<TitleVersion>,
    queued_content: HashSet<String>,
    pub(crate) plan: DownloadPlan,
}

impl ResolutionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visited(&self, key: &TitleVersion) -> bool {
        self.visited_titles.contains(key)
    }

    pub fn visited_count(&self) -> usize {
        self.visited_titles.len()
    }

    pub(crate) fn mark_visited(&mut self, key: TitleVersion) {
        self.visited_titles.insert(key);
    }

    /// Returns `true` if the content id was not queued before.
    pub(crate) fn queue_content(&mut self, content_id: &str) -> bool {
        if self.queued_content.contains(content_id) {
            return false;
        }
        self.queued_content.insert(content_id.to_string())
    }

    pub fn is_queued(&self, content_id: &str) -> bool {
        self.queued_content.contains(content_id)
    }

    pub fn queued_count(&self) -> usize {
        self.queued_content.len()
    }

    pub fn plan(&self) -> &DownloadPlan {
        &self.plan
    }
}
