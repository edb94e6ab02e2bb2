// build-sleuth-catalog/src/koji.rs
// ============================================================================
// Module: Koji Hub Catalog
// Description: Blocking client for the Koji build system hub.
// Purpose: Implement the KojiCatalog contract over the JSON gateway.
// Dependencies: build-sleuth-core, crate::http, serde_json
// ============================================================================

//! ## Overview
//! One hub operation per POST, batched inputs split into `multicall_size`
//! chunks issued sequentially inside the client; the resolver owns any
//! cross-chunk parallelism. Every batched response is validated for
//! list-in/list-out parity before it reaches the caller. Archive type
//! enrichment annotates locally from a memoized copy of the hub's
//! archive-type map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use build_sleuth_core::core::BuildInfo;
use build_sleuth_core::core::Nvra;
use build_sleuth_core::core::RemoteArchive;
use build_sleuth_core::core::RpmInfo;
use build_sleuth_core::core::TagInfo;
use build_sleuth_core::core::TaskInfo;
use build_sleuth_core::interfaces::ArchiveTypeInfo;
use build_sleuth_core::interfaces::CatalogError;
use build_sleuth_core::interfaces::KojiCatalog;
use serde_json::json;
use tracing::debug;

use crate::http::GatewayConfig;
use crate::http::JsonGateway;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration of the Koji hub client.
#[derive(Debug, Clone)]
pub struct KojiHubConfig {
    /// Transport configuration.
    pub gateway: GatewayConfig,
    /// Chunk size for batched operations.
    pub multicall_size: usize,
}

impl KojiHubConfig {
    /// Creates a configuration with transport defaults for the hub URL.
    #[must_use]
    pub fn new(base_url: url::Url) -> Self {
        Self {
            gateway: GatewayConfig::new(base_url),
            multicall_size: 8,
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking Koji hub client.
pub struct KojiHubCatalog {
    /// JSON transport.
    gateway: JsonGateway,
    /// Chunk size for batched operations.
    multicall_size: usize,
    /// Memoized archive-type map used for local enrichment.
    archive_types: Mutex<Option<Vec<ArchiveTypeInfo>>>,
}

impl KojiHubCatalog {
    /// Creates a hub client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the transport cannot be constructed.
    pub fn new(config: KojiHubConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            gateway: JsonGateway::new(config.gateway)?,
            multicall_size: config.multicall_size.max(1),
            archive_types: Mutex::new(None),
        })
    }

    /// Returns the memoized archive-type map, fetching it once.
    fn archive_type_map(&self) -> Result<Vec<ArchiveTypeInfo>, CatalogError> {
        let mut cached = self
            .archive_types
            .lock()
            .map_err(|_| CatalogError::Transport("archive type lock poisoned".to_string()))?;

        if let Some(types) = cached.as_ref() {
            return Ok(types.clone());
        }

        let types: Vec<ArchiveTypeInfo> = self.gateway.post("getArchiveTypes", &json!({}))?;
        debug!(types = types.len(), "fetched archive types");
        *cached = Some(types.clone());

        Ok(types)
    }

    /// Validates list-in/list-out parity of a batched hub response.
    fn expect_parity<T>(
        operation: &str,
        inputs: usize,
        outputs: &[T],
    ) -> Result<(), CatalogError> {
        if inputs == outputs.len() {
            Ok(())
        } else {
            Err(CatalogError::Protocol(format!(
                "{operation} returned {} results for {inputs} inputs",
                outputs.len()
            )))
        }
    }
}

impl KojiCatalog for KojiHubCatalog {
    fn archive_types(&self) -> Result<Vec<ArchiveTypeInfo>, CatalogError> {
        self.archive_type_map()
    }

    fn list_archives_by_checksums(
        &self,
        checksums: &[String],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        let mut results = Vec::with_capacity(checksums.len());

        for chunk in checksums.chunks(self.multicall_size) {
            let lists: Vec<Vec<RemoteArchive>> =
                self.gateway.post("listArchives", &json!({ "checksums": chunk }))?;
            Self::expect_parity("listArchives", chunk.len(), &lists)?;
            results.extend(lists);
        }

        Ok(results)
    }

    fn get_builds(&self, ids: &[i32]) -> Result<Vec<Option<BuildInfo>>, CatalogError> {
        let mut results = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(self.multicall_size) {
            let builds: Vec<Option<BuildInfo>> =
                self.gateway.post("getBuild", &json!({ "ids": chunk }))?;
            Self::expect_parity("getBuild", chunk.len(), &builds)?;
            results.extend(builds);
        }

        Ok(results)
    }

    fn list_tags(&self, ids: &[i32]) -> Result<Vec<Vec<TagInfo>>, CatalogError> {
        let mut results = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(self.multicall_size) {
            let tags: Vec<Vec<TagInfo>> =
                self.gateway.post("listTags", &json!({ "ids": chunk }))?;
            Self::expect_parity("listTags", chunk.len(), &tags)?;
            results.extend(tags);
        }

        Ok(results)
    }

    fn get_task_info(
        &self,
        task_ids: &[i32],
        with_requests: bool,
    ) -> Result<Vec<Option<TaskInfo>>, CatalogError> {
        let mut results = Vec::with_capacity(task_ids.len());

        for chunk in task_ids.chunks(self.multicall_size) {
            let tasks: Vec<Option<TaskInfo>> = self
                .gateway
                .post("getTaskInfo", &json!({ "ids": chunk, "request": with_requests }))?;
            Self::expect_parity("getTaskInfo", chunk.len(), &tasks)?;
            results.extend(tasks);
        }

        Ok(results)
    }

    fn list_archives_by_builds(
        &self,
        ids: &[i32],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        let mut results = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(self.multicall_size) {
            let lists: Vec<Vec<RemoteArchive>> =
                self.gateway.post("listArchives", &json!({ "buildIds": chunk }))?;
            Self::expect_parity("listArchives", chunk.len(), &lists)?;
            results.extend(lists);
        }

        Ok(results)
    }

    fn get_rpms(&self, nvras: &[Nvra]) -> Result<Vec<Option<RpmInfo>>, CatalogError> {
        let references: Vec<String> = nvras.iter().map(ToString::to_string).collect();
        let mut results = Vec::with_capacity(references.len());

        for chunk in references.chunks(self.multicall_size) {
            let rpms: Vec<Option<RpmInfo>> =
                self.gateway.post("getRPM", &json!({ "rpms": chunk }))?;
            Self::expect_parity("getRPM", chunk.len(), &rpms)?;
            results.extend(rpms);
        }

        Ok(results)
    }

    fn list_rpms_by_builds(&self, ids: &[i32]) -> Result<Vec<Vec<RpmInfo>>, CatalogError> {
        let mut results = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(self.multicall_size) {
            let lists: Vec<Vec<RpmInfo>> =
                self.gateway.post("listBuildRPMs", &json!({ "ids": chunk }))?;
            Self::expect_parity("listBuildRPMs", chunk.len(), &lists)?;
            results.extend(lists);
        }

        Ok(results)
    }

    fn enrich_archive_type_info(
        &self,
        archives: &mut [RemoteArchive],
    ) -> Result<(), CatalogError> {
        if archives.iter().all(|archive| !archive.missing_type_info()) {
            return Ok(());
        }

        let types = self.archive_type_map()?;

        for archive in archives.iter_mut().filter(|archive| archive.missing_type_info()) {
            let matched = types.iter().find(|info| {
                info.extensions
                    .iter()
                    .any(|extension| archive.filename.ends_with(extension))
            });

            if let Some(info) = matched {
                archive.btype = Some(info.name.clone());
                archive.type_extensions = Some(info.extensions.clone());
            }
        }

        Ok(())
    }
}
