// build-sleuth-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Resolver Cache
// Description: Map-backed cache facade for tests and cache-less tooling.
// Purpose: Provide the ResolverCache contract without persistence.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A cache facade backed by plain maps behind a mutex. Semantics match the
//! persistent store: empty lists are valid negative entries, and build puts
//! return the previous value so callers can detect conflicting re-caches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::core::ChecksumType;
use crate::core::PncArtifact;
use crate::core::PncBuild;
use crate::core::RemoteArchive;
use crate::core::ResolvedBuild;
use crate::interfaces::CacheError;
use crate::interfaces::ResolverCache;

// ============================================================================
// SECTION: In-Memory Cache
// ============================================================================

/// The five resolver maps, held in memory.
#[derive(Debug, Default)]
struct CacheMaps {
    /// Archive lists by `(type, digest)`.
    archives: BTreeMap<(ChecksumType, String), Vec<RemoteArchive>>,
    /// RPM builds by `(type, digest)`.
    rpm_builds: BTreeMap<(ChecksumType, String), ResolvedBuild>,
    /// Builds by id.
    builds: BTreeMap<i32, ResolvedBuild>,
    /// PNC artifact lists by `(type, digest)`.
    pnc_artifacts: BTreeMap<(ChecksumType, String), Vec<PncArtifact>>,
    /// PNC builds by build record id.
    pnc_builds: BTreeMap<i32, PncBuild>,
}

/// Map-backed [`ResolverCache`] with no persistence.
#[derive(Debug, Default)]
pub struct InMemoryResolverCache {
    /// Cache contents.
    maps: Mutex<CacheMaps>,
}

impl InMemoryResolverCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs an operation over the locked maps.
    fn with_maps<T>(&self, operate: impl FnOnce(&mut CacheMaps) -> T) -> Result<T, CacheError> {
        let mut maps = self
            .maps
            .lock()
            .map_err(|_| CacheError::Io("cache mutex poisoned".to_string()))?;
        Ok(operate(&mut maps))
    }
}

impl ResolverCache for InMemoryResolverCache {
    fn archives_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<Vec<RemoteArchive>>, CacheError> {
        self.with_maps(|maps| maps.archives.get(&(checksum_type, value.to_string())).cloned())
    }

    fn put_archives_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        archives: Vec<RemoteArchive>,
    ) -> Result<(), CacheError> {
        self.with_maps(|maps| {
            maps.archives.insert((checksum_type, value.to_string()), archives);
        })
    }

    fn rpm_build_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<ResolvedBuild>, CacheError> {
        self.with_maps(|maps| maps.rpm_builds.get(&(checksum_type, value.to_string())).cloned())
    }

    fn put_rpm_build_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        build: ResolvedBuild,
    ) -> Result<(), CacheError> {
        self.with_maps(|maps| {
            maps.rpm_builds.insert((checksum_type, value.to_string()), build);
        })
    }

    fn build_by_id(&self, id: i32) -> Result<Option<ResolvedBuild>, CacheError> {
        self.with_maps(|maps| maps.builds.get(&id).cloned())
    }

    fn put_build_by_id(
        &self,
        id: i32,
        build: ResolvedBuild,
    ) -> Result<Option<ResolvedBuild>, CacheError> {
        self.with_maps(|maps| maps.builds.insert(id, build))
    }

    fn pnc_artifacts_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
    ) -> Result<Option<Vec<PncArtifact>>, CacheError> {
        self.with_maps(|maps| maps.pnc_artifacts.get(&(checksum_type, value.to_string())).cloned())
    }

    fn put_pnc_artifacts_by_checksum(
        &self,
        checksum_type: ChecksumType,
        value: &str,
        artifacts: Vec<PncArtifact>,
    ) -> Result<(), CacheError> {
        self.with_maps(|maps| {
            maps.pnc_artifacts.insert((checksum_type, value.to_string()), artifacts);
        })
    }

    fn pnc_build_by_id(&self, id: i32) -> Result<Option<PncBuild>, CacheError> {
        self.with_maps(|maps| maps.pnc_builds.get(&id).cloned())
    }

    fn put_pnc_build_by_id(
        &self,
        id: i32,
        build: PncBuild,
    ) -> Result<Option<PncBuild>, CacheError> {
        self.with_maps(|maps| maps.pnc_builds.insert(id, build))
    }
}
