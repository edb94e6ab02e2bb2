// build-sleuth-core/src/core/archive.rs
// ============================================================================
// Module: Archive Types
// Description: Catalog-side archives, RPMs, and their local attributions.
// Purpose: Model the content records matched between local files and builds.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RemoteArchive`] is what the catalog knows about one archive; a
//! [`LocalArchive`] binds one catalog record (archive or RPM) to the local
//! filenames that carried its content. RPM identity is the NVRA tuple parsed
//! from the local filename.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::checksum::Checksum;
use crate::core::checksum::ChecksumType;

// ============================================================================
// SECTION: Remote Records
// ============================================================================

/// A catalog archive record returned by checksum or build queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArchive {
    /// Archive identifier; strictly negative for synthetic entries.
    pub archive_id: i32,
    /// Identifier of the build that produced the archive.
    pub build_id: i32,
    /// Archive filename within the build.
    pub filename: String,
    /// Hex digest of the archive content.
    pub checksum: String,
    /// Algorithm of the stored digest.
    pub checksum_type: ChecksumType,
    /// Archive type name, filled in by type enrichment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btype: Option<String>,
    /// Extensions associated with the archive type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_extensions: Option<Vec<String>>,
}

impl RemoteArchive {
    /// Returns true when type enrichment has not yet run for the archive.
    #[must_use]
    pub fn missing_type_info(&self) -> bool {
        self.btype.is_none()
    }
}

/// A catalog RPM record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmInfo {
    /// RPM identifier.
    pub id: i32,
    /// Identifier of the build that produced the RPM.
    pub build_id: i32,
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package release.
    pub release: String,
    /// Package architecture.
    pub arch: String,
    /// Name-version-release string.
    pub nvr: String,
    /// MD5 digest of the RPM payload.
    pub payloadhash: String,
}

impl RpmInfo {
    /// Returns the RPM filename form `name-version-release.arch.rpm`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}-{}-{}.{}.rpm", self.name, self.version, self.release, self.arch)
    }
}

// ============================================================================
// SECTION: NVRA
// ============================================================================

/// The RPM identity tuple parsed from a local filename.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nvra {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package release.
    pub release: String,
    /// Package architecture.
    pub arch: String,
}

impl Nvra {
    /// Parses `name-version-release.arch[.rpm]` from a filename.
    ///
    /// Leading directories and enclosing-archive prefixes (`outer!/inner`)
    /// are stripped before parsing. Returns `None` when the basename does not
    /// carry the three dashes and the architecture dot the format requires.
    #[must_use]
    pub fn parse(filename: &str) -> Option<Self> {
        let basename = filename
            .rsplit(['/'])
            .next()
            .unwrap_or(filename);
        let trimmed = basename.strip_suffix(".rpm").unwrap_or(basename);

        let (front, arch) = trimmed.rsplit_once('.')?;
        let (front, release) = front.rsplit_once('-')?;
        let (name, version) = front.rsplit_once('-')?;

        if name.is_empty() || version.is_empty() || release.is_empty() || arch.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
        })
    }
}

impl fmt::Display for Nvra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}.{}", self.name, self.version, self.release, self.arch)
    }
}

// ============================================================================
// SECTION: Local Attribution
// ============================================================================

/// The catalog record a local archive is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveRef {
    /// An archive record.
    Archive(RemoteArchive),
    /// An RPM record.
    Rpm(RpmInfo),
}

impl ArchiveRef {
    /// Identifier of the underlying record.
    #[must_use]
    pub fn archive_id(&self) -> i32 {
        match self {
            Self::Archive(archive) => archive.archive_id,
            Self::Rpm(rpm) => rpm.id,
        }
    }

    /// Identifier of the owning build.
    #[must_use]
    pub fn build_id(&self) -> i32 {
        match self {
            Self::Archive(archive) => archive.build_id,
            Self::Rpm(rpm) => rpm.build_id,
        }
    }

    /// Filename of the underlying record.
    #[must_use]
    pub fn filename(&self) -> String {
        match self {
            Self::Archive(archive) => archive.filename.clone(),
            Self::Rpm(rpm) => rpm.filename(),
        }
    }

    /// Returns the checksum value carried by the record, when typed `md5`.
    #[must_use]
    pub fn matches_checksum(&self, checksum: &Checksum) -> bool {
        match self {
            Self::Archive(archive) => {
                archive.checksum_type == checksum.checksum_type
                    && archive.checksum == checksum.value
            }
            Self::Rpm(rpm) => {
                checksum.checksum_type == ChecksumType::Md5 && rpm.payloadhash == checksum.value
            }
        }
    }
}

/// One catalog record bound to the local filenames carrying its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalArchive {
    /// The catalog record.
    pub archive: ArchiveRef,
    /// Local filenames whose content matched the record.
    pub filenames: BTreeSet<String>,
    /// Checksums the analyzer computed for the matched files.
    #[serde(default)]
    pub checksums: BTreeSet<Checksum>,
    /// Nested filenames that could not be attributed to any build.
    #[serde(default)]
    pub unmatched_filenames: BTreeSet<String>,
    /// False once any nested file fails attribution.
    pub built_from_source: bool,
}

impl LocalArchive {
    /// Binds a catalog record to its local filenames and checksums.
    #[must_use]
    pub fn new(
        archive: ArchiveRef,
        filenames: BTreeSet<String>,
        checksums: BTreeSet<Checksum>,
    ) -> Self {
        Self {
            archive,
            filenames,
            checksums,
            unmatched_filenames: BTreeSet::new(),
            built_from_source: true,
        }
    }

    /// Records a nested filename with no attributable build.
    pub fn add_unmatched(&mut self, filename: impl Into<String>) {
        self.unmatched_filenames.insert(filename.into());
        self.built_from_source = false;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvra_parses_plain_rpm_filename() {
        let nvra = Nvra::parse("acl-2.2.53-1.el8.x86_64.rpm").unwrap();
        assert_eq!(nvra.name, "acl");
        assert_eq!(nvra.version, "2.2.53");
        assert_eq!(nvra.release, "1.el8");
        assert_eq!(nvra.arch, "x86_64");
        assert_eq!(nvra.to_string(), "acl-2.2.53-1.el8.x86_64");
    }

    #[test]
    fn nvra_strips_directories_and_nesting() {
        let nvra = Nvra::parse("dist.zip!/rpms/x-1-1.noarch.rpm").unwrap();
        assert_eq!(nvra.name, "x");
        assert_eq!(nvra.arch, "noarch");
    }

    #[test]
    fn nvra_rejects_malformed_names() {
        assert!(Nvra::parse("notanrpm.txt").is_none());
        assert!(Nvra::parse("missing-dashes.rpm").is_none());
        assert!(Nvra::parse("").is_none());
    }

    #[test]
    fn unmatched_filename_clears_built_from_source() {
        let archive = RemoteArchive {
            archive_id: 1,
            build_id: 2,
            filename: "a.jar".to_string(),
            checksum: "aa".to_string(),
            checksum_type: ChecksumType::Md5,
            btype: None,
            type_extensions: None,
        };
        let mut local =
            LocalArchive::new(ArchiveRef::Archive(archive), BTreeSet::new(), BTreeSet::new());
        assert!(local.built_from_source);

        local.add_unmatched("a.jar!/inner.txt");
        assert!(!local.built_from_source);
        assert!(local.unmatched_filenames.contains("a.jar!/inner.txt"));
    }
}
