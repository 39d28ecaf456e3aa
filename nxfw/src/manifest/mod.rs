//! CNMT content meta decoding.
//!
//! A decoded manifest holds one of two record layouts, chosen by the meta
//! type byte in its header:
//!
//! ```text
//! 0x00  u64  title id
//! 0x08  u32  title version
//! 0x0C  u8   meta type          (0x03 = system update)
//! 0x0E  u16  extended header size (table offset)
//! 0x10  u16  content entry count
//! 0x12  u16  content meta entry count
//! 0x20  ...  extended header, then the entry table
//! ```
//!
//! System update manifests list other titles (16-byte records); every other
//! meta type lists content blobs with their SHA-256 (56-byte records).

mod decoder;
mod error;

pub use decoder::{decode, decode_file};
pub use error::ManifestError;

use crate::title::TitleId;
use crate::version::PackedVersion;

/// Meta type byte of a system update manifest.
pub const META_TYPE_SYSTEM_UPDATE: u8 = 0x03;

/// Reference to another title, found in system update manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRef {
    pub title_id: TitleId,
    pub version: PackedVersion,
}

/// Reference to a downloadable content blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    /// 32 lower-case hex digits.
    pub content_id: String,
    /// SHA-256 of the blob, 64 lower-case hex digits.
    pub hash: String,
}

/// A single manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Title(TitleRef),
    Content(ContentRef),
}

/// Entry table of a manifest. A manifest never mixes the two kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntries {
    Titles(Vec<TitleRef>),
    Contents(Vec<ContentRef>),
}

impl ManifestEntries {
    pub fn len(&self) -> usize {
        match self {
            Self::Titles(v) => v.len(),
            Self::Contents(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in table order as the tagged union.
    pub fn to_vec(&self) -> Vec<ManifestEntry> {
        match self {
            Self::Titles(v) => v.iter().cloned().map(ManifestEntry::Title).collect(),
            Self::Contents(v) => v.iter().cloned().map(ManifestEntry::Content).collect(),
        }
    }
}

/// Fixed header fields of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestHeader {
    pub title_id: TitleId,
    pub version: PackedVersion,
    pub meta_type: u8,
    pub table_offset: u16,
    pub entry_count: u16,
}

impl ManifestHeader {
    pub fn is_system_update(&self) -> bool {
        self.meta_type == META_TYPE_SYSTEM_UPDATE
    }
}

/// A decoded manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub header: ManifestHeader,
    pub entries: ManifestEntries,
}
