// build-sleuth-core/src/core/pnc.rs
// ============================================================================
// Module: PNC Types
// Description: PNC catalog records and their adaptation to resolved builds.
// Purpose: Model the second build system behind the canonical build shape.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! PNC exposes artifacts and build records instead of archives and builds.
//! The resolver queries artifacts by MD5, picks one by quality, follows its
//! first build record, and adapts the aggregate [`PncBuild`] into the same
//! [`ResolvedBuild`] shape used for Koji so the output map stays uniform.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::core::archive::RemoteArchive;
use crate::core::build::BuildInfo;
use crate::core::build::BuildState;
use crate::core::build::ResolvedBuild;
use crate::core::build::TagInfo;
use crate::core::checksum::ChecksumType;

// ============================================================================
// SECTION: Artifact Quality
// ============================================================================

/// Quality label attached to a PNC artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactQuality {
    /// Newly created artifact.
    New,
    /// Verified artifact.
    Verified,
    /// Tested artifact.
    Tested,
    /// Deprecated artifact.
    Deprecated,
    /// Blacklisted artifact.
    Blacklisted,
    /// Deleted artifact.
    Deleted,
    /// Temporary artifact.
    Temporary,
    /// Any label this code does not know.
    #[serde(other)]
    Unknown,
}

impl ArtifactQuality {
    /// Returns the ranking score used for best-artifact selection.
    #[must_use]
    pub const fn score(self) -> i32 {
        match self {
            Self::Tested => 3,
            Self::Verified => 2,
            Self::New => 1,
            Self::Unknown => 0,
            Self::Deprecated => -1,
            Self::Temporary => -2,
            Self::Blacklisted => -3,
            Self::Deleted => -4,
        }
    }
}

// ============================================================================
// SECTION: PNC Records
// ============================================================================

/// A PNC artifact matched by checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PncArtifact {
    /// Artifact identifier.
    pub id: i32,
    /// Artifact filename.
    pub filename: String,
    /// Quality label.
    pub quality: ArtifactQuality,
    /// Build records that produced the artifact, in catalog order.
    #[serde(default)]
    pub build_record_ids: Vec<i32>,
    /// MD5 digest of the artifact content.
    pub md5: String,
}

/// A PNC build record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Build record identifier.
    pub id: i32,
    /// Identifier of the build configuration used.
    pub build_configuration_id: i32,
    /// Name of the execution root, `groupId:artifactId` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_root_name: Option<String>,
    /// Version of the execution root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_root_version: Option<String>,
}

/// A PNC build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    /// Build configuration identifier.
    pub id: i32,
    /// Build configuration name.
    pub name: String,
    /// Product version the configuration belongs to, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_version_id: Option<i32>,
}

/// A PNC product version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVersion {
    /// Product version identifier.
    pub id: i32,
    /// Product name.
    pub product_name: String,
    /// Product version string.
    pub version: String,
}

/// Result of pushing a build record to the long-term archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    /// Push result identifier.
    pub id: i32,
    /// Build record the result belongs to.
    pub build_record_id: i32,
    /// Identifier the build received in the archive system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brew_build_id: Option<i32>,
}

// ============================================================================
// SECTION: PNC Build Aggregate
// ============================================================================

/// A PNC build record enriched with its related catalog entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PncBuild {
    /// The build record.
    pub build_record: BuildRecord,
    /// Build configuration, when fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_configuration: Option<BuildConfiguration>,
    /// Product version, when the configuration names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_version: Option<ProductVersion>,
    /// Push result, when the build was pushed onward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_result: Option<PushResult>,
    /// Artifacts built by the record, plus any matched during resolution.
    #[serde(default)]
    pub artifacts: Vec<PncArtifact>,
}

impl PncBuild {
    /// Creates an aggregate holding only the build record.
    #[must_use]
    pub fn new(build_record: BuildRecord) -> Self {
        Self {
            build_record,
            build_configuration: None,
            product_version: None,
            push_result: None,
            artifacts: Vec::new(),
        }
    }

    /// Returns the name-version-release form used for logging.
    #[must_use]
    pub fn nvr(&self) -> String {
        adapted_build_info(self).nvr()
    }
}

// ============================================================================
// SECTION: Adaptation
// ============================================================================

/// Adapts a PNC build to the canonical resolved-build shape.
///
/// The execution root supplies name and version; the product version becomes
/// a tag so the selector and reports see PNC builds the same way they see
/// tagged Koji builds.
#[must_use]
pub fn pnc_build_to_resolved(pnc_build: &PncBuild) -> ResolvedBuild {
    let mut resolved = ResolvedBuild::new(adapted_build_info(pnc_build));

    if let Some(product_version) = &pnc_build.product_version {
        resolved.tags.push(TagInfo {
            id: product_version.id,
            name: format!("{}-{}", product_version.product_name, product_version.version),
        });
    }

    resolved.remote_archives = pnc_build
        .artifacts
        .iter()
        .map(|artifact| artifact_to_remote_archive(pnc_build, artifact))
        .collect();

    resolved
}

/// Converts a PNC artifact to the canonical remote-archive shape.
#[must_use]
pub fn artifact_to_remote_archive(pnc_build: &PncBuild, artifact: &PncArtifact) -> RemoteArchive {
    RemoteArchive {
        archive_id: artifact.id,
        build_id: pnc_build.build_record.id,
        filename: artifact.filename.clone(),
        checksum: artifact.md5.clone(),
        checksum_type: ChecksumType::Md5,
        btype: None,
        type_extensions: None,
    }
}

/// Replaces an empty adapted version with a stable placeholder.
pub fn fix_null_version(resolved: &mut ResolvedBuild) {
    if resolved.build_info.version.is_empty() {
        resolved.build_info.version = "0".to_string();
    }
}

/// Builds the canonical metadata for a PNC build.
fn adapted_build_info(pnc_build: &PncBuild) -> BuildInfo {
    let record = &pnc_build.build_record;
    let name = record
        .execution_root_name
        .as_deref()
        .map(|root| root.replace(':', "-"))
        .or_else(|| {
            pnc_build
                .build_configuration
                .as_ref()
                .map(|configuration| configuration.name.clone())
        })
        .unwrap_or_else(|| format!("build-record-{}", record.id));
    let version = record.execution_root_version.clone().unwrap_or_default();

    let mut type_names = BTreeSet::new();
    type_names.insert("maven".to_string());

    BuildInfo {
        id: record.id,
        package_id: record.build_configuration_id,
        state: BuildState::Complete,
        name,
        version,
        release: "1".to_string(),
        task_id: None,
        type_names,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> BuildRecord {
        BuildRecord {
            id: 42,
            build_configuration_id: 7,
            execution_root_name: Some("org.acme:widget".to_string()),
            execution_root_version: Some("1.2.3".to_string()),
        }
    }

    #[test]
    fn quality_scores_rank_tested_highest() {
        assert!(ArtifactQuality::Tested.score() > ArtifactQuality::Verified.score());
        assert!(ArtifactQuality::Verified.score() > ArtifactQuality::New.score());
        assert!(ArtifactQuality::New.score() > ArtifactQuality::Unknown.score());
        assert!(ArtifactQuality::Deleted.score() < ArtifactQuality::Blacklisted.score());
    }

    #[test]
    fn adaptation_uses_execution_root_and_product_tag() {
        let mut pnc_build = PncBuild::new(sample_record());
        pnc_build.product_version = Some(ProductVersion {
            id: 3,
            product_name: "acme".to_string(),
            version: "1.2".to_string(),
        });

        let resolved = pnc_build_to_resolved(&pnc_build);
        assert_eq!(resolved.build_info.id, 42);
        assert_eq!(resolved.build_info.name, "org.acme-widget");
        assert_eq!(resolved.build_info.version, "1.2.3");
        assert_eq!(resolved.build_info.state, BuildState::Complete);
        assert_eq!(resolved.tags.len(), 1);
        assert_eq!(resolved.tags[0].name, "acme-1.2");
    }

    #[test]
    fn fix_null_version_fills_placeholder() {
        let mut record = sample_record();
        record.execution_root_version = None;

        let mut resolved = pnc_build_to_resolved(&PncBuild::new(record));
        assert!(resolved.build_info.version.is_empty());

        fix_null_version(&mut resolved);
        assert_eq!(resolved.build_info.version, "0");
    }
}
