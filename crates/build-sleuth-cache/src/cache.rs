// build-sleuth-cache/src/cache.rs
// ============================================================================
// Module: File Resolver Cache
// Description: The five-map resolver cache facade over JSON map stores.
// Purpose: Give the resolver persistent read/write-through lookups.
// Dependencies: build-sleuth-core, crate::store
// ============================================================================

//! ## Overview
//! The facade owns one [`JsonMapStore`] per logical resolver map: archive
//! lists and RPM builds per digest type, builds by id, PNC artifact lists per
//! digest type, and PNC builds by record id. Map names match the files a
//! previous run left behind, so partial results survive across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use build_sleuth_core::core::ChecksumType;
use build_sleuth_core::core::PncArtifact;
use build_sleuth_core::core::PncBuild;
use build_sleuth_core::core::RemoteArchive;
use build_sleuth_core::core::ResolvedBuild;
use build_sleuth_core::interfaces::CacheError;
use build_sleuth_core::interfaces::ResolverCache;
use tracing::debug;

use crate::store::JsonMapStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the build-by-id map.
const BUILDS_MAP: &str = "builds";
/// Name of the PNC build-by-id map.
const PNC_BUILDS_MAP: &str = "builds-pnc";
/// Prefix of the per-type RPM build maps.
const RPMS_MAP_PREFIX: &str = "rpms-";
/// Prefix of the per-type PNC artifact maps.
const PNC_CHECKSUMS_MAP_PREFIX: &str = "checksums-pnc-";

// ============================================================================
// SECTION: File Resolver Cache
// ============================================================================

/// Persistent [`ResolverCache`] backed by JSON files in one directory.
#[derive(Debug)]
pub struct FileResolverCache {
    /// Archive lists per digest type.
    archives: BTreeMap<ChecksumType, JsonMapStore<Vec<RemoteArchive>>>,
    /// RPM builds per digest type.
    rpm_builds: BTreeMap<ChecksumType, JsonMapStore<ResolvedBuild>>,
    /// Builds by id.
    builds: JsonMapStore<ResolvedBuild>,
    /// PNC artifact lists per digest type.
    pnc_artifacts: BTreeMap<ChecksumType, JsonMapStore<Vec<PncArtifact>>>,
    /// PNC builds by build record id.
    pnc_builds: JsonMapStore<PncBuild>,
}

impl FileResolverCache {
    /// Opens the cache under a directory for the configured digest types.
    ///
    /// The directory is created when missing. Digest types outside the
    /// configured set read as misses and ignore writes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the directory or a map cannot be opened.
    pub fn open(
        directory: &Path,
        checksum_types: &BTreeSet<ChecksumType>,
    ) -> Result<Self, CacheError> {
        fs::create_dir_all(directory)
            .map_err(|error| CacheError::Io(error.to_string()))?;

        let mut archives = BTreeMap::new();
        let mut rpm_builds = BTreeMap::new();
        let mut pnc_artifacts = BTreeMap::new();

        for checksum_type in checksum_types {
            archives.insert(
                *checksum_type,
                JsonMapStore::open(directory, &checksum_type.cache_name())?,
            );
            rpm_builds.insert(
                *checksum_type,
                JsonMapStore::open(
                    directory,
                    &format!("{RPMS_MAP_PREFIX}{}", checksum_type.algorithm()),
                )?,
            );
            pnc_artifacts.insert(
                *checksum_type,
                JsonMapStore::open(
                    directory,
                    &format!("{PNC_CHECKSUMS_MAP_PREFIX}{}", checksum_type.algorithm()),
                )?,
            );
        }

        debug!(directory = %directory.display(), types = checksum_types.len(), "opened cache");

        Ok(Self {
            archives,
            rpm_builds,
            builds: JsonMapStore::open(directory, BUILDS_MAP)?,
            pnc_artifacts,
            pnc_builds: JsonMapStore::open(directory, PNC_BUILDS_MAP)?,
        })
    }

    /// Flushes every dirty map to disk.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when any map fails to persist.
    pub fn flush(&self) -> Result<(), CacheError> {
        for store in self.archives.values() {
            store.flush()?;
        }
        for store in self.rpm_builds.values() {
            store.flush()?;
        }
        for store in self.pnc_artifacts.values() {
            store.flush()?;
        }
        self.builds.flush()?;
        self.pnc_builds.flush()
    }
}

impl ResolverCache for FileResolverCache {
    fn archives_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<Vec<RemoteArchive>>, CacheError> {
        match self.archives.get(&checksum_type) {
            Some(store) => store.get(value),
            None => Ok(None),
        }
    }

    fn put_archives_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        archives: Vec<RemoteArchive>,
    ) -> Result<(), CacheError> {
        if let Some(store) = self.archives.get(&checksum_type) {
            store.put(value, archives)?;
        }
        Ok(())
    }

    fn rpm_build_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<ResolvedBuild>, CacheError> {
        match self.rpm_builds.get(&checksum_type) {
            Some(store) => store.get(value),
            None => Ok(None),
        }
    }

    fn put_rpm_build_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        build: ResolvedBuild,
    ) -> Result<(), CacheError> {
        if let Some(store) = self.rpm_builds.get(&checksum_type) {
            store.put(value, build)?;
        }
        Ok(())
    }

    fn build_by_id(&self, id: i32) -> Result<Option<ResolvedBuild>, CacheError> {
        self.builds.get(&id.to_string())
    }

    fn put_build_by_id(
        &self,
        id: i32,
        build: ResolvedBuild,
    ) -> Result<Option<ResolvedBuild>, CacheError> {
        self.builds.put(&id.to_string(), build)
    }

    fn pnc_artifacts_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<Vec<PncArtifact>>, CacheError> {
        match self.pnc_artifacts.get(&checksum_type) {
            Some(store) => store.get(value),
            None => Ok(None),
        }
    }

    fn put_pnc_artifacts_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        artifacts: Vec<PncArtifact>,
    ) -> Result<(), CacheError> {
        if let Some(store) = self.pnc_artifacts.get(&checksum_type) {
            store.put(value, artifacts)?;
        }
        Ok(())
    }

    fn pnc_build_by_id(&self, id: i32) -> Result<Option<PncBuild>, CacheError> {
        self.pnc_builds.get(&id.to_string())
    }

    fn put_pnc_build_by_id(
        &self,
        id: i32,
        build: PncBuild,
    ) -> Result<Option<PncBuild>, CacheError> {
        self.pnc_builds.put(&id.to_string(), build)
    }
}
