//! Version discovery, computation, and rewriting.
//!
//! [`VersionRegistry`] finds the files that carry a project's version, agrees
//! on a single working version, and rewrites every file when bumping.
//! [`format`] knows how each file type stores its version.

pub mod format;
pub mod registry;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use format::{FormatError, VersionFormat};
pub use registry::{ProjectFile, VersionRegistry};

/// Working version used when no file yields one.
pub const DEFAULT_VERSION: Version = Version::new(0, 1, 0);

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver: {0}")]
    InvalidSemver(#[from] semver::Error),

    /// The version has pre-release or build metadata.
    #[error("version must be a plain MAJOR.MINOR.PATCH triple, got {0}")]
    NotPlainTriple(String),

    /// The bumped component would exceed `u64::MAX`.
    #[error("cannot apply a {level} bump to {version}: component overflows")]
    Overflow {
        /// The version being bumped.
        version: Version,
        /// The requested level.
        level: BumpLevel,
    },

    /// An override list named a file whose format can't be inferred.
    #[error("unsupported version file: {0}")]
    UnknownFormat(String),

    /// Reading or writing a version file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file's version field could not be read or written.
    #[error("{path} ({format}): {source}")]
    Format {
        /// The file.
        path: String,
        /// Its format.
        format: VersionFormat,
        /// What went wrong.
        source: FormatError,
    },

    /// Two files in the override list disagree.
    #[error(
        "version mismatch: {first} has {first_version} but {other} has {other_version}"
    )]
    Mismatch {
        /// The file that set the working version.
        first: String,
        /// Its version.
        first_version: Version,
        /// The disagreeing file.
        other: String,
        /// Its version.
        other_version: Version,
    },

    /// The override list is invalid.
    #[error(transparent)]
    BumpConfig(#[from] crate::bump_config::BumpConfigError),

    /// A git operation failed.
    #[error("git error: {0}")]
    Git(#[from] crate::git::GitError),
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// Semver bump level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl BumpLevel {
    /// All levels, smallest first.
    pub const ALL: [Self; 3] = [Self::Patch, Self::Minor, Self::Major];
}

impl std::fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Compute the next version by applying a bump level.
///
/// Fails when the bumped component is already `u64::MAX`.
pub fn next_version(current: &Version, level: BumpLevel) -> VersionResult<Version> {
    let overflow = || VersionError::Overflow {
        version: current.clone(),
        level,
    };
    Ok(match level {
        BumpLevel::Patch => Version::new(
            current.major,
            current.minor,
            current.patch.checked_add(1).ok_or_else(overflow)?,
        ),
        BumpLevel::Minor => Version::new(
            current.major,
            current.minor.checked_add(1).ok_or_else(overflow)?,
            0,
        ),
        BumpLevel::Major => Version::new(current.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
    })
}

/// Parse a version string, stripping an optional `v` prefix.
pub fn parse_version(s: &str) -> VersionResult<Version> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    Ok(Version::parse(s)?)
}

/// Parse a version that must be a plain `MAJOR.MINOR.PATCH` triple.
pub fn parse_plain_version(s: &str) -> VersionResult<Version> {
    let version = parse_version(s)?;
    if !version.pre.is_empty() || !version.build.is_empty() {
        return Err(VersionError::NotPlainTriple(s.to_string()));
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_patch() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_version(&v, BumpLevel::Patch).unwrap(), Version::new(1, 2, 4));
    }

    #[test]
    fn bump_minor() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_version(&v, BumpLevel::Minor).unwrap(), Version::new(1, 3, 0));
    }

    #[test]
    fn bump_major() {
        let v = Version::new(1, 2, 3);
        assert_eq!(next_version(&v, BumpLevel::Major).unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn bump_overflow_is_an_error() {
        let v = Version::new(1, 2, u64::MAX);
        assert!(matches!(
            next_version(&v, BumpLevel::Patch),
            Err(VersionError::Overflow { level: BumpLevel::Patch, .. })
        ));
        assert_eq!(next_version(&v, BumpLevel::Minor).unwrap(), Version::new(1, 3, 0));

        let v = Version::new(u64::MAX, 0, 0);
        assert!(next_version(&v, BumpLevel::Major).is_err());
        assert_eq!(next_version(&v, BumpLevel::Patch).unwrap(), Version::new(u64::MAX, 0, 1));
    }

    #[test]
    fn parse_with_v_prefix() {
        assert_eq!(parse_version("v1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn parse_without_v_prefix() {
        assert_eq!(parse_version("1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn parse_invalid() {
        assert!(parse_version("not-a-version").is_err());
        assert!(parse_version("1.2").is_err());
    }

    #[test]
    fn plain_version_rejects_prerelease_and_build() {
        assert!(matches!(
            parse_plain_version("1.2.3-rc.1"),
            Err(VersionError::NotPlainTriple(_))
        ));
        assert!(matches!(
            parse_plain_version("1.2.3+build.5"),
            Err(VersionError::NotPlainTriple(_))
        ));
        assert_eq!(parse_plain_version("v2.0.0").unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn bump_from_default() {
        let v = DEFAULT_VERSION;
        assert_eq!(next_version(&v, BumpLevel::Patch).unwrap(), Version::new(0, 1, 1));
        assert_eq!(next_version(&v, BumpLevel::Minor).unwrap(), Version::new(0, 2, 0));
        assert_eq!(next_version(&v, BumpLevel::Major).unwrap(), Version::new(1, 0, 0));
    }
}
