// build-sleuth-core/src/interfaces/mod.rs
// ============================================================================
// Module: Resolver Interfaces
// Description: Backend-agnostic interfaces for catalogs and caches.
// Purpose: Define the contract surfaces used by the resolution engine.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the resolver reaches the two remote build systems
//! and the persistent cache without embedding backend details. Batched
//! operations keep list-in/list-out parity: result position `i` always
//! answers input position `i`, and an empty sublist means no match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::BuildInfo;
use crate::core::ChecksumType;
use crate::core::Nvra;
use crate::core::PncArtifact;
use crate::core::PncBuild;
use crate::core::RemoteArchive;
use crate::core::ResolvedBuild;
use crate::core::RpmInfo;
use crate::core::TagInfo;
use crate::core::TaskInfo;
use crate::core::BuildConfiguration;
use crate::core::BuildRecord;
use crate::core::ProductVersion;
use crate::core::PushResult;

// ============================================================================
// SECTION: Catalog Errors
// ============================================================================

/// Errors reported by remote catalog backends.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog reported a server-side failure.
    #[error("catalog remote error: {0}")]
    Remote(String),
    /// The request could not be transported.
    #[error("catalog transport error: {0}")]
    Transport(String),
    /// The response violated the batched contract shape.
    #[error("catalog protocol error: {0}")]
    Protocol(String),
}

// ============================================================================
// SECTION: Koji Catalog
// ============================================================================

/// An archive type known to the Koji catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTypeInfo {
    /// Archive type name.
    pub name: String,
    /// Filename extensions belonging to the type.
    pub extensions: Vec<String>,
}

/// Query surface of the Koji build system.
///
/// Implementations must be callable from multiple worker threads at once;
/// the resolver fans batched checksum lookups out over a bounded pool.
pub trait KojiCatalog: Sync {
    /// Returns the archive type map of the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn archive_types(&self) -> Result<Vec<ArchiveTypeInfo>, CatalogError>;

    /// Looks up archives for a batch of checksum values.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn list_archives_by_checksums(
        &self,
        checksums: &[String],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError>;

    /// Fetches build metadata for a batch of build identifiers.
    ///
    /// A missing build yields `None` at its position.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_builds(&self, ids: &[i32]) -> Result<Vec<Option<BuildInfo>>, CatalogError>;

    /// Lists tags for a batch of build identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn list_tags(&self, ids: &[i32]) -> Result<Vec<Vec<TagInfo>>, CatalogError>;

    /// Fetches task metadata for a batch of task identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_task_info(
        &self,
        task_ids: &[i32],
        with_requests: bool,
    ) -> Result<Vec<Option<TaskInfo>>, CatalogError>;

    /// Lists all archives produced by each build in a batch.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn list_archives_by_builds(
        &self,
        ids: &[i32],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError>;

    /// Looks up RPMs by NVRA reference.
    ///
    /// A missing RPM yields `None` at its position.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_rpms(&self, nvras: &[Nvra]) -> Result<Vec<Option<RpmInfo>>, CatalogError>;

    /// Lists all RPMs produced by each build in a batch.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn list_rpms_by_builds(&self, ids: &[i32]) -> Result<Vec<Vec<RpmInfo>>, CatalogError>;

    /// Annotates archive type fields in place.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn enrich_archive_type_info(
        &self,
        archives: &mut [RemoteArchive],
    ) -> Result<(), CatalogError>;
}

// ============================================================================
// SECTION: PNC Catalog
// ============================================================================

/// Query surface of the PNC build system.
pub trait PncCatalog {
    /// Looks up artifacts for a batch of MD5 values.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_artifacts_by_md5(
        &self,
        values: &[String],
    ) -> Result<Vec<Vec<PncArtifact>>, CatalogError>;

    /// Fetches build records by identifier, parallel to the input ids.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_build_records(&self, ids: &[i32]) -> Result<Vec<BuildRecord>, CatalogError>;

    /// Fetches build configurations by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_build_configurations(
        &self,
        ids: &[i32],
    ) -> Result<Vec<BuildConfiguration>, CatalogError>;

    /// Fetches product versions by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_product_versions(&self, ids: &[i32]) -> Result<Vec<ProductVersion>, CatalogError>;

    /// Fetches push results for a batch of build record identifiers.
    ///
    /// A record that was never pushed yields `None` at its position.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_build_record_push_results(
        &self,
        ids: &[i32],
    ) -> Result<Vec<Option<PushResult>>, CatalogError>;

    /// Fetches the artifacts built by each record in a batch.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot be queried.
    fn get_built_artifacts(&self, ids: &[i32]) -> Result<Vec<Vec<PncArtifact>>, CatalogError>;
}

// ============================================================================
// SECTION: Resolver Cache
// ============================================================================

/// Cache errors surfaced by the persistent map facade.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache I/O error.
    #[error("cache io error: {0}")]
    Io(String),
    /// Cache entry could not be serialized or deserialized.
    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Typed facade over the five persistent resolver maps.
///
/// All maps are read-through and write-through. Storing an empty list for a
/// checksum is a valid negative entry and must round-trip as such. `put`
/// operations on the build maps return the previous value so callers can
/// detect conflicting re-caches.
pub trait ResolverCache {
    /// Reads the archive list cached for a checksum.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn archives_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<Vec<RemoteArchive>>, CacheError>;

    /// Writes the archive list for a checksum, empty lists included.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be written.
    fn put_archives_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        archives: Vec<RemoteArchive>,
    ) -> Result<(), CacheError>;

    /// Reads the RPM build cached for a checksum.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn rpm_build_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<ResolvedBuild>, CacheError>;

    /// Writes the RPM build for a checksum.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be written.
    fn put_rpm_build_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        build: ResolvedBuild,
    ) -> Result<(), CacheError>;

    /// Reads a cached build by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn build_by_id(&self, id: i32) -> Result<Option<ResolvedBuild>, CacheError>;

    /// Writes a build by identifier, returning the previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be written.
    fn put_build_by_id(
        &self,
        id: i32,
        build: ResolvedBuild,
    ) -> Result<Option<ResolvedBuild>, CacheError>;

    /// Reads the PNC artifact list cached for a checksum.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn pnc_artifacts_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<Vec<PncArtifact>>, CacheError>;

    /// Writes the PNC artifact list for a checksum, empty lists included.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be written.
    fn put_pnc_artifacts_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        artifacts: Vec<PncArtifact>,
    ) -> Result<(), CacheError>;

    /// Reads a cached PNC build by build record identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be read.
    fn pnc_build_by_id(&self, id: i32) -> Result<Option<PncBuild>, CacheError>;

    /// Writes a PNC build by build record identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the cache cannot be written.
    fn put_pnc_build_by_id(
        &self,
        id: i32,
        build: PncBuild,
    ) -> Result<Option<PncBuild>, CacheError>;
}
