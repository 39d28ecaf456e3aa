//! Resolution errors.

use thiserror::Error;

use crate::manifest::ManifestError;
use crate::source::SourceError;
use crate::title::TitleVersion;

/// Errors that abort a resolution run.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The manifest source failed for a reason other than not-found.
    #[error("failed to look up {title}: {source}")]
    Source {
        title: TitleVersion,
        #[source]
        source: SourceError,
    },

    /// A fetched manifest could not be decoded.
    #[error("malformed manifest for {title}: {source}")]
    Decode {
        title: TitleVersion,
        #[source]
        source: ManifestError,
    },

    /// The walk went deeper than the configured ceiling.
    #[error("title graph deeper than {max_depth} levels at {title}")]
    TooDeep { title: TitleVersion, max_depth: usize },

    /// The walk visited more titles than the configured ceiling.
    #[error("title graph exceeds {max_titles} titles at {title}")]
    TooManyTitles {
        title: TitleVersion,
        max_titles: usize,
    },
}
