//! Title identifiers and the resolution key.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::version::PackedVersion;

/// Error returned when a title id string is not 16 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid title id '{0}': expected 16 hex digits")]
pub struct TitleIdError(pub String);

/// A 64-bit title identifier.
///
/// Rendered as 16 upper-case hex digits, the form the CDN uses in URLs.
/// Parsing accepts either case, so comparisons never depend on how an id
/// was spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleId(u64);

impl TitleId {
    /// Root system update title; its manifest lists every system title.
    pub const SYSTEM_UPDATE: TitleId = TitleId(0x0100_0000_0000_0816);

    /// SystemVersion title for the FAT build of the firmware.
    pub const SYSTEM_VERSION_FAT: TitleId = TitleId(0x0100_0000_0000_0809);

    /// SystemVersion title for the exFAT build of the firmware.
    pub const SYSTEM_VERSION_EXFAT: TitleId = TitleId(0x0100_0000_0000_081B);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for TitleId {
    type Err = TitleIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TitleIdError(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| TitleIdError(s.to_string()))
    }
}

impl From<u64> for TitleId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identity of one manifest lookup: a title at a version, fetched either as
/// an update-type (system update) or as a regular content-type manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TitleVersion {
    pub title_id: TitleId,
    pub version: PackedVersion,
    pub is_update: bool,
}

impl TitleVersion {
    pub fn new(title_id: TitleId, version: PackedVersion, is_update: bool) -> Self {
        Self {
            title_id,
            version,
            is_update,
        }
    }
}

impl fmt::Display for TitleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.title_id, self.version.raw())?;
        if self.is_update {
            f.write_str(" (update)")?;
        }
        Ok(())
    }
}
