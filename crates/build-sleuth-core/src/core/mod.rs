// build-sleuth-core/src/core/mod.rs
// ============================================================================
// Module: Core Types
// Description: Canonical data model of the build resolution engine.
// Purpose: Provide stable, serializable types shared by all crates.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types cover the three vocabularies the resolver speaks: analyzer
//! checksums, Koji builds and archives, and PNC artifacts and build records.
//! These types are the canonical source of truth for the persisted JSON maps.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod archive;
pub mod build;
pub mod checksum;
pub mod pnc;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use archive::ArchiveRef;
pub use archive::LocalArchive;
pub use archive::Nvra;
pub use archive::RemoteArchive;
pub use archive::RpmInfo;
pub use build::BuildInfo;
pub use build::BuildKey;
pub use build::BuildState;
pub use build::BuildSystem;
pub use build::NOT_FOUND;
pub use build::ParseBuildKeyError;
pub use build::ResolvedBuild;
pub use build::TagInfo;
pub use build::TaskInfo;
pub use checksum::Checksum;
pub use checksum::ChecksumType;
pub use pnc::ArtifactQuality;
pub use pnc::BuildConfiguration;
pub use pnc::BuildRecord;
pub use pnc::PncArtifact;
pub use pnc::PncBuild;
pub use pnc::ProductVersion;
pub use pnc::PushResult;
pub use pnc::artifact_to_remote_archive;
pub use pnc::fix_null_version;
pub use pnc::pnc_build_to_resolved;
