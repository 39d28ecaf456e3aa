//! Packed title versions.
//!
//! System titles carry their version as a single `u32` with the dotted
//! components packed into fixed-width bit ranges:
//!
//! ```text
//!  31      26 25    20 19  16 15               0
//! +----------+--------+------+------------------+
//! |  major   | minor  | patch|      build       |
//! +----------+--------+------+------------------+
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAJOR_UNIT: u32 = 0x400_0000;
const MINOR_UNIT: u32 = 0x10_0000;
const PATCH_UNIT: u32 = 0x1_0000;

const MAX_MAJOR: u32 = u32::MAX / MAJOR_UNIT;
const MAX_MINOR: u32 = MAJOR_UNIT / MINOR_UNIT - 1;
const MAX_PATCH: u32 = MINOR_UNIT / PATCH_UNIT - 1;
const MAX_BUILD: u32 = PATCH_UNIT - 1;

/// Errors produced when building a version from components or text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The dotted string did not have 3 or 4 numeric components.
    #[error("invalid version string '{0}': expected major.minor.patch[.build]")]
    Malformed(String),

    /// A component does not fit its packed bit range.
    #[error("version component {name}={value} exceeds maximum {max}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        max: u32,
    },
}

/// A packed 32-bit title version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackedVersion(u32);

impl PackedVersion {
    /// Wrap a raw packed value. Every `u32` is a valid version.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Build a version from its components.
    pub fn compose(major: u32, minor: u32, patch: u32, build: u32) -> Result<Self, VersionError> {
        check("major", major, MAX_MAJOR)?;
        check("minor", minor, MAX_MINOR)?;
        check("patch", patch, MAX_PATCH)?;
        check("build", build, MAX_BUILD)?;

        Ok(Self(
            major * MAJOR_UNIT + minor * MINOR_UNIT + patch * PATCH_UNIT + build,
        ))
    }

    /// Parse `major.minor.patch[.build]`; a missing build defaults to 0.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError::Malformed(s.to_string()))?;

        match parts.as_slice() {
            [major, minor, patch] => Self::compose(*major, *minor, *patch, 0),
            [major, minor, patch, build] => Self::compose(*major, *minor, *patch, *build),
            _ => Err(VersionError::Malformed(s.to_string())),
        }
    }

    /// The raw packed value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Split into `(major, minor, patch, build)`.
    pub const fn decompose(self) -> (u32, u32, u32, u32) {
        let v = self.0;
        (
            v / MAJOR_UNIT,
            (v % MAJOR_UNIT) / MINOR_UNIT,
            (v % MINOR_UNIT) / PATCH_UNIT,
            v % PATCH_UNIT,
        )
    }

    /// `major.minor.patch`, used for directory names.
    pub fn simple(self) -> String {
        let (major, minor, patch, _) = self.decompose();
        format!("{}.{}.{}", major, minor, patch)
    }

    /// `major.minor.patch.bbbb` with the build zero-padded to four digits.
    pub fn full(self) -> String {
        let (major, minor, patch, build) = self.decompose();
        format!("{}.{}.{}.{:04}", major, minor, patch, build)
    }

    /// Both renderings at once: `(simple, full)`.
    pub fn format(self) -> (String, String) {
        (self.simple(), self.full())
    }
}

fn check(name: &'static str, value: u32, max: u32) -> Result<(), VersionError> {
    if value > max {
        return Err(VersionError::OutOfRange { name, value, max });
    }
    Ok(())
}

impl From<u32> for PackedVersion {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for PackedVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PackedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}
