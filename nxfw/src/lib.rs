//! nxfw - system update firmware downloader
//!
//! Resolves a system update title into the complete, deduplicated set of
//! content blobs it is made of, downloads them from the CDN and checks that
//! nothing is missing.
//!
//! The pieces, in the order a run uses them:
//!
//! - [`version`]: packed 32-bit versions and their dotted renderings
//! - [`source`]: where manifests come from (CDN + `hactool`)
//! - [`manifest`]: CNMT decoding
//! - [`resolver`]: the recursive title walk
//! - [`plan`]: the resulting download list and SystemVersion markers
//! - [`download`]: bulk fetching (`aria2c` or built-in)
//! - [`verify`]: completion check
//! - [`orchestrator`]: one full run

pub mod config;
pub mod device;
pub mod download;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod plan;
pub mod resolver;
pub mod source;
pub mod title;
pub mod verify;
pub mod version;

pub use error::{FirmwareError, FirmwareResult};
pub use orchestrator::{FirmwareDownloader, RunReport};
pub use title::{TitleId, TitleVersion};
pub use version::PackedVersion;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
