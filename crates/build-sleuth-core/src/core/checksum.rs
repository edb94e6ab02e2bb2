// build-sleuth-core/src/core/checksum.rs
// ============================================================================
// Module: Checksum Types
// Description: Content digests emitted by the distribution analyzer.
// Purpose: Provide the checksum record and digest-type metadata for resolution.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Checksum`] is one content digest of one local file, keyed by the digest
//! algorithm. The analyzer emits one record per `(algorithm, file)` pair; the
//! resolver only ever consumes them and never recomputes digests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hex digest of the empty input under MD5.
const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";
/// Hex digest of the empty input under SHA-1.
const EMPTY_SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
/// Hex digest of the empty input under SHA-256.
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Basename prefix for persisted checksum maps.
const CHECKSUMS_FILENAME_BASENAME: &str = "checksums-";

// ============================================================================
// SECTION: Checksum Type
// ============================================================================

/// Digest algorithms understood by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    /// MD5, the only algorithm resolved against the remote catalogs.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl ChecksumType {
    /// All supported digest algorithms.
    pub const ALL: [Self; 3] = [Self::Md5, Self::Sha1, Self::Sha256];

    /// Returns the lowercase algorithm name.
    #[must_use]
    pub const fn algorithm(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }

    /// Returns the hex digest of the empty input for this algorithm.
    #[must_use]
    pub const fn empty_digest(self) -> &'static str {
        match self {
            Self::Md5 => EMPTY_MD5,
            Self::Sha1 => EMPTY_SHA1,
            Self::Sha256 => EMPTY_SHA256,
        }
    }

    /// Returns the basename of the persisted checksum map for this algorithm.
    #[must_use]
    pub fn cache_name(self) -> String {
        format!("{CHECKSUMS_FILENAME_BASENAME}{}", self.algorithm())
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm())
    }
}

// ============================================================================
// SECTION: Checksum Record
// ============================================================================

/// One content digest of one local file, as reported by the analyzer.
///
/// Records are immutable once emitted. The filename is the analyzer's path
/// form, where nested archive members use `outer!/inner` notation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Checksum {
    /// Digest algorithm that produced the value.
    #[serde(rename = "type")]
    pub checksum_type: ChecksumType,
    /// Lowercase hex digest.
    pub value: String,
    /// Analyzer filename the digest was computed for.
    pub filename: String,
}

impl Checksum {
    /// Creates a new checksum record.
    #[must_use]
    pub fn new(
        checksum_type: ChecksumType,
        value: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            checksum_type,
            value: value.into(),
            filename: filename.into(),
        }
    }

    /// Returns true when the value is the empty-input digest for its type.
    #[must_use]
    pub fn is_empty_digest(&self) -> bool {
        self.value == self.checksum_type.empty_digest()
    }

    /// Picks the first checksum of the wanted type from a set.
    pub fn find_by_type<'a, I>(checksums: I, checksum_type: ChecksumType) -> Option<&'a Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        checksums.into_iter().find(|checksum| checksum.checksum_type == checksum_type)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.checksum_type, self.value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
