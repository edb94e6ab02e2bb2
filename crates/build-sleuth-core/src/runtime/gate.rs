// build-sleuth-core/src/runtime/gate.rs
// ============================================================================
// Module: Checksum Gate
// Description: Pre-resolution filtering of analyzer checksums.
// Purpose: Drop empty digests and report unrecognized filename extensions.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The gate filters exactly one class of input: digests of the empty input,
//! which match everything and nothing. Filename extensions outside the known
//! archive set are reported but still pass through; the catalog lookup is the
//! authority on whether such content resolves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;
use tracing::warn;

use crate::core::Checksum;
use crate::interfaces::ArchiveTypeInfo;
use crate::interfaces::CatalogError;
use crate::interfaces::KojiCatalog;

// ============================================================================
// SECTION: Checksum Gate
// ============================================================================

/// Extension-aware filter applied to every drained checksum entry.
#[derive(Debug, Clone)]
pub struct ChecksumGate {
    /// Archive extensions recognized for build lookup, without `rpm`.
    extensions: Vec<String>,
}

impl ChecksumGate {
    /// Builds the gate from the catalog archive-type map and configuration.
    ///
    /// A non-empty `archive_types` narrows the known types; a non-empty
    /// `archive_extensions` then narrows the extension set. Empty lists
    /// default to everything the catalog knows, with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the archive-type map cannot be fetched.
    pub fn from_catalog(
        catalog: &dyn KojiCatalog,
        archive_types: &[String],
        archive_extensions: &[String],
    ) -> Result<Self, CatalogError> {
        let all_types = catalog.archive_types()?;
        Ok(Self::from_archive_types(&all_types, archive_types, archive_extensions))
    }

    /// Builds the gate from an already-fetched archive-type map.
    #[must_use]
    pub fn from_archive_types(
        all_types: &[ArchiveTypeInfo],
        archive_types: &[String],
        archive_extensions: &[String],
    ) -> Self {
        let types_to_check: Vec<&ArchiveTypeInfo> = if archive_types.is_empty() {
            warn!("supplied archive types list is empty; defaulting to all known archive types");
            all_types.iter().collect()
        } else {
            all_types
                .iter()
                .filter(|info| archive_types.iter().any(|name| name == &info.name))
                .collect()
        };

        let known: Vec<String> = types_to_check
            .iter()
            .flat_map(|info| info.extensions.iter().cloned())
            .collect();

        let extensions = if archive_extensions.is_empty() {
            warn!(
                known = known.len(),
                "supplied archive extensions list is empty; defaulting to all known extensions"
            );
            known
        } else {
            archive_extensions
                .iter()
                .filter(|extension| known.contains(extension))
                .cloned()
                .collect()
        };

        debug!(extensions = extensions.len(), "archive extensions to check");

        Self {
            extensions,
        }
    }

    /// Returns the recognized archive extensions.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Reports and filters empty-digest entries.
    ///
    /// Returns true only for the empty-input digest. An extension miss is
    /// reported as a warning but the entry is kept; the catalog decides.
    #[must_use]
    pub fn should_skip<'a, I>(&self, checksum: &Checksum, filenames: I) -> bool
    where
        I: IntoIterator<Item = &'a String> + Clone,
    {
        if checksum.is_empty_digest() {
            let files: Vec<&String> = filenames.into_iter().collect();
            warn!(%checksum, ?files, "skipped empty digest");
            return true;
        }

        let recognized = filenames.into_iter().any(|filename| {
            filename.ends_with(".rpm")
                || self.extensions.iter().any(|extension| filename.ends_with(extension))
        });

        if !recognized {
            warn!(%checksum, "no recognized archive extension for files");
        }

        false
    }

    /// Returns true when any filename names an RPM.
    #[must_use]
    pub fn is_rpm_entry<'a, I>(filenames: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        filenames.into_iter().any(|filename| filename.ends_with(".rpm"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChecksumType;

    fn sample_types() -> Vec<ArchiveTypeInfo> {
        vec![
            ArchiveTypeInfo {
                name: "jar".to_string(),
                extensions: vec!["jar".to_string(), "war".to_string()],
            },
            ArchiveTypeInfo {
                name: "zip".to_string(),
                extensions: vec!["zip".to_string()],
            },
        ]
    }

    #[test]
    fn empty_config_defaults_to_all_known_extensions() {
        let gate = ChecksumGate::from_archive_types(&sample_types(), &[], &[]);
        assert_eq!(gate.extensions(), ["jar", "war", "zip"]);
    }

    #[test]
    fn configured_extensions_are_filtered_by_known() {
        let configured = vec!["zip".to_string(), "tar".to_string()];
        let gate = ChecksumGate::from_archive_types(&sample_types(), &[], &configured);
        assert_eq!(gate.extensions(), ["zip"]);
    }

    #[test]
    fn archive_types_narrow_the_known_set() {
        let types = vec!["zip".to_string()];
        let gate = ChecksumGate::from_archive_types(&sample_types(), &types, &[]);
        assert_eq!(gate.extensions(), ["zip"]);
    }

    #[test]
    fn skips_only_empty_digests() {
        let gate = ChecksumGate::from_archive_types(&sample_types(), &[], &[]);
        let empty = Checksum::new(ChecksumType::Md5, ChecksumType::Md5.empty_digest(), "a.jar");
        let files = vec!["a.jar".to_string()];
        assert!(gate.should_skip(&empty, &files));

        let odd = Checksum::new(ChecksumType::Md5, "ab", "a.unknown");
        let odd_files = vec!["a.unknown".to_string()];
        assert!(!gate.should_skip(&odd, &odd_files));
    }

    #[test]
    fn rpm_entries_are_detected_by_any_filename() {
        let files = vec!["doc.txt".to_string(), "pkg-1-1.noarch.rpm".to_string()];
        assert!(ChecksumGate::is_rpm_entry(&files));

        let none = vec!["doc.txt".to_string()];
        assert!(!ChecksumGate::is_rpm_entry(&none));
    }
}
