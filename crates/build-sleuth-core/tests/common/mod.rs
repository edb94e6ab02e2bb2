// build-sleuth-core/tests/common/mod.rs
// ============================================================================
// Module: Resolver Test Support
// Description: Fake catalogs and record builders for resolver tests.
// Purpose: Drive the resolution engine without any network.
// ============================================================================

//! ## Overview
//! In-memory fakes of the two catalog contracts, with a shared remote-call
//! counter so tests can assert cache behavior, plus builders for the records
//! the scenarios need.

#![allow(dead_code, reason = "Each integration test uses a subset of the helpers.")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use build_sleuth_core::ArchiveTypeInfo;
use build_sleuth_core::BuildConfiguration;
use build_sleuth_core::BuildInfo;
use build_sleuth_core::BuildRecord;
use build_sleuth_core::BuildState;
use build_sleuth_core::CatalogError;
use build_sleuth_core::Checksum;
use build_sleuth_core::ChecksumTable;
use build_sleuth_core::ChecksumType;
use build_sleuth_core::KojiCatalog;
use build_sleuth_core::Nvra;
use build_sleuth_core::PncArtifact;
use build_sleuth_core::PncCatalog;
use build_sleuth_core::ProductVersion;
use build_sleuth_core::PushResult;
use build_sleuth_core::RemoteArchive;
use build_sleuth_core::RpmInfo;
use build_sleuth_core::TagInfo;
use build_sleuth_core::TaskInfo;

// ============================================================================
// SECTION: Fake Koji Catalog
// ============================================================================

/// Canned Koji catalog with a remote-call counter.
#[derive(Debug, Default)]
pub struct FakeKoji {
    /// Archive types returned by the catalog.
    pub archive_types: Vec<ArchiveTypeInfo>,
    /// Archive lists by checksum value.
    pub archives_by_checksum: BTreeMap<String, Vec<RemoteArchive>>,
    /// Build metadata by id.
    pub builds: BTreeMap<i32, BuildInfo>,
    /// Tags by build id.
    pub tags: BTreeMap<i32, Vec<TagInfo>>,
    /// Archives by build id.
    pub archives_by_build: BTreeMap<i32, Vec<RemoteArchive>>,
    /// Task metadata by task id.
    pub tasks: BTreeMap<i32, TaskInfo>,
    /// RPMs by NVRA string.
    pub rpms_by_nvra: BTreeMap<String, RpmInfo>,
    /// RPM lists by build id.
    pub rpms_by_build: BTreeMap<i32, Vec<RpmInfo>>,
    /// Number of remote operations served.
    pub remote_calls: AtomicUsize,
}

impl FakeKoji {
    /// Creates a fake knowing the `jar` and `zip` archive types.
    pub fn new() -> Self {
        Self {
            archive_types: vec![
                ArchiveTypeInfo {
                    name: "jar".to_string(),
                    extensions: vec!["jar".to_string(), "war".to_string()],
                },
                ArchiveTypeInfo {
                    name: "zip".to_string(),
                    extensions: vec!["zip".to_string()],
                },
            ],
            ..Self::default()
        }
    }

    /// Returns the number of remote operations served so far.
    pub fn calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl KojiCatalog for FakeKoji {
    fn archive_types(&self) -> Result<Vec<ArchiveTypeInfo>, CatalogError> {
        self.count();
        Ok(self.archive_types.clone())
    }

    fn list_archives_by_checksums(
        &self,
        checksums: &[String],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        self.count();
        Ok(checksums
            .iter()
            .map(|value| self.archives_by_checksum.get(value).cloned().unwrap_or_default())
            .collect())
    }

    fn get_builds(&self, ids: &[i32]) -> Result<Vec<Option<BuildInfo>>, CatalogError> {
        self.count();
        Ok(ids.iter().map(|id| self.builds.get(id).cloned()).collect())
    }

    fn list_tags(&self, ids: &[i32]) -> Result<Vec<Vec<TagInfo>>, CatalogError> {
        self.count();
        Ok(ids.iter().map(|id| self.tags.get(id).cloned().unwrap_or_default()).collect())
    }

    fn get_task_info(
        &self,
        task_ids: &[i32],
        _with_requests: bool,
    ) -> Result<Vec<Option<TaskInfo>>, CatalogError> {
        self.count();
        Ok(task_ids.iter().map(|id| self.tasks.get(id).cloned()).collect())
    }

    fn list_archives_by_builds(
        &self,
        ids: &[i32],
    ) -> Result<Vec<Vec<RemoteArchive>>, CatalogError> {
        self.count();
        Ok(ids
            .iter()
            .map(|id| self.archives_by_build.get(id).cloned().unwrap_or_default())
            .collect())
    }

    fn get_rpms(&self, nvras: &[Nvra]) -> Result<Vec<Option<RpmInfo>>, CatalogError> {
        self.count();
        Ok(nvras.iter().map(|nvra| self.rpms_by_nvra.get(&nvra.to_string()).cloned()).collect())
    }

    fn list_rpms_by_builds(&self, ids: &[i32]) -> Result<Vec<Vec<RpmInfo>>, CatalogError> {
        self.count();
        Ok(ids
            .iter()
            .map(|id| self.rpms_by_build.get(id).cloned().unwrap_or_default())
            .collect())
    }

    fn enrich_archive_type_info(
        &self,
        archives: &mut [RemoteArchive],
    ) -> Result<(), CatalogError> {
        self.count();
        for archive in archives.iter_mut().filter(|archive| archive.missing_type_info()) {
            let matched = self.archive_types.iter().find(|info| {
                info.extensions.iter().any(|extension| archive.filename.ends_with(extension))
            });
            if let Some(info) = matched {
                archive.btype = Some(info.name.clone());
                archive.type_extensions = Some(info.extensions.clone());
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Fake PNC Catalog
// ============================================================================

/// Canned PNC catalog with a remote-call counter.
#[derive(Debug, Default)]
pub struct FakePnc {
    /// Artifact lists by MD5 value.
    pub artifacts_by_md5: BTreeMap<String, Vec<PncArtifact>>,
    /// Build records by id.
    pub build_records: BTreeMap<i32, BuildRecord>,
    /// Build configurations by id.
    pub build_configurations: BTreeMap<i32, BuildConfiguration>,
    /// Product versions by id.
    pub product_versions: BTreeMap<i32, ProductVersion>,
    /// Push results by build record id.
    pub push_results: BTreeMap<i32, PushResult>,
    /// Built artifact lists by build record id.
    pub built_artifacts: BTreeMap<i32, Vec<PncArtifact>>,
    /// Number of remote operations served.
    pub remote_calls: AtomicUsize,
}

impl FakePnc {
    /// Creates an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of remote operations served so far.
    pub fn calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl PncCatalog for FakePnc {
    fn get_artifacts_by_md5(
        &self,
        values: &[String],
    ) -> Result<Vec<Vec<PncArtifact>>, CatalogError> {
        self.count();
        Ok(values
            .iter()
            .map(|value| self.artifacts_by_md5.get(value).cloned().unwrap_or_default())
            .collect())
    }

    fn get_build_records(&self, ids: &[i32]) -> Result<Vec<BuildRecord>, CatalogError> {
        self.count();
        Ok(ids.iter().filter_map(|id| self.build_records.get(id).cloned()).collect())
    }

    fn get_build_configurations(
        &self,
        ids: &[i32],
    ) -> Result<Vec<BuildConfiguration>, CatalogError> {
        self.count();
        Ok(ids.iter().filter_map(|id| self.build_configurations.get(id).cloned()).collect())
    }

    fn get_product_versions(&self, ids: &[i32]) -> Result<Vec<ProductVersion>, CatalogError> {
        self.count();
        Ok(ids.iter().filter_map(|id| self.product_versions.get(id).cloned()).collect())
    }

    fn get_build_record_push_results(
        &self,
        ids: &[i32],
    ) -> Result<Vec<Option<PushResult>>, CatalogError> {
        self.count();
        Ok(ids.iter().map(|id| self.push_results.get(id).cloned()).collect())
    }

    fn get_built_artifacts(&self, ids: &[i32]) -> Result<Vec<Vec<PncArtifact>>, CatalogError> {
        self.count();
        Ok(ids
            .iter()
            .map(|id| self.built_artifacts.get(id).cloned().unwrap_or_default())
            .collect())
    }
}

// ============================================================================
// SECTION: Record Builders
// ============================================================================

/// Builds a remote archive record.
pub fn archive(archive_id: i32, build_id: i32, filename: &str, checksum: &str) -> RemoteArchive {
    RemoteArchive {
        archive_id,
        build_id,
        filename: filename.to_string(),
        checksum: checksum.to_string(),
        checksum_type: ChecksumType::Md5,
        btype: None,
        type_extensions: None,
    }
}

/// Builds canonical build metadata.
pub fn build_info(id: i32, state: BuildState, task_id: Option<i32>) -> BuildInfo {
    BuildInfo {
        id,
        package_id: id,
        state,
        name: format!("pkg-{id}"),
        version: "1.0".to_string(),
        release: "1".to_string(),
        task_id,
        type_names: BTreeSet::new(),
    }
}

/// Builds a tag record.
pub fn tag(id: i32, name: &str) -> TagInfo {
    TagInfo {
        id,
        name: name.to_string(),
    }
}

/// Builds a task record.
pub fn task(task_id: i32) -> TaskInfo {
    TaskInfo {
        task_id,
        method: "build".to_string(),
        request: None,
    }
}

/// Builds an MD5 checksum record.
pub fn md5(value: &str, filename: &str) -> Checksum {
    Checksum::new(ChecksumType::Md5, value, filename)
}

/// Builds a checksum table from `(checksum, filenames)` rows.
pub fn table(rows: &[(&Checksum, &[&str])]) -> ChecksumTable {
    let mut table = ChecksumTable::new();
    for (checksum, filenames) in rows {
        table.insert(
            (*checksum).clone(),
            filenames.iter().map(|name| (*name).to_string()).collect(),
        );
    }
    table
}

/// Asserts that every filename appears in at most one local archive.
pub fn assert_single_ownership(
    builds: &BTreeMap<build_sleuth_core::BuildKey, build_sleuth_core::ResolvedBuild>,
) {
    let mut seen: BTreeSet<&String> = BTreeSet::new();
    for build in builds.values() {
        for local in &build.archives {
            for filename in &local.filenames {
                assert!(
                    seen.insert(filename),
                    "filename {filename} owned by more than one archive"
                );
            }
        }
    }
}
