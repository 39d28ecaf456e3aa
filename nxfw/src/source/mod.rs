//! Where manifests come from.
//!
//! The resolver only sees the [`ManifestSource`] trait. The CDN-backed
//! implementation is assembled from smaller pieces:
//!
//! ```text
//! CdnSource
//!     ├── HttpClient (trait)        ── ReqwestClient (mutual TLS)
//!     ├── CdnEndpoints              ── URL scheme per environment/device
//!     └── ManifestExtractor (trait) ── HactoolExtractor
//! ```

mod cdn;
mod endpoints;
mod error;
mod extractor;
pub mod http;
mod meta;

pub use cdn::CdnSource;
pub use endpoints::{CdnEndpoints, DEFAULT_ENVIRONMENT};
pub use error::SourceError;
pub use extractor::{default_hactool, HactoolExtractor, ManifestExtractor};
pub use http::{
    ClientSettings, HttpClient, HttpError, HttpResponse, ReqwestClient, DEFAULT_TIMEOUT_SECS,
};
pub use meta::latest_system_version;

use crate::plan::DownloadJob;
use crate::title::TitleVersion;

/// Result of a successful manifest lookup.
#[derive(Debug, Clone)]
pub struct ManifestLookup {
    /// Content id of the manifest container.
    pub content_id: String,
    /// The container as a plan entry; already on disk when returned.
    pub container: DownloadJob,
    /// Raw manifest bytes extracted from the container.
    pub bytes: Vec<u8>,
}

/// Source of manifests for title resolution.
pub trait ManifestSource {
    /// Fetch and extract the manifest for a title at a version.
    ///
    /// Returns [`SourceError::NotFound`] when the remote has no such
    /// title/version; any other error is fatal to the run.
    fn lookup(&self, key: &TitleVersion) -> Result<ManifestLookup, SourceError>;

    /// Download URL of a content blob.
    fn content_url(&self, content_id: &str) -> String;
}

impl<T: ManifestSource + ?Sized> ManifestSource for &T {
    fn lookup(&self, key: &TitleVersion) -> Result<ManifestLookup, SourceError> {
        (**self).lookup(key)
    }

    fn content_url(&self, content_id: &str) -> String {
        (**self).content_url(content_id)
    }
}
