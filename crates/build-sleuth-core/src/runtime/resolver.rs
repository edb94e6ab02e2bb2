// build-sleuth-core/src/runtime/resolver.rs
// ============================================================================
// Module: Build Resolver
// Description: Orchestration of checksum-to-build resolution.
// Purpose: Drain analyzer checksums, query catalogs, and populate the output map.
// Dependencies: crate::{core, interfaces, runtime}, crossbeam-channel, tracing
// ============================================================================

//! ## Overview
//! The resolver owns the output map. It drains the analyzer queue in batches,
//! filters entries through the checksum gate, short-circuits on cache hits,
//! fans batched catalog lookups out over a bounded worker pool, and promotes
//! exactly one build per checksum via the candidate selector. Worker threads
//! only compute and return values; all shared state is mutated from the
//! resolver thread, so output contents depend on the input batch rather than
//! task completion order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::ArchiveRef;
use crate::core::BuildKey;
use crate::core::Checksum;
use crate::core::ChecksumType;
use crate::core::LocalArchive;
use crate::core::Nvra;
use crate::core::PncArtifact;
use crate::core::PncBuild;
use crate::core::RemoteArchive;
use crate::core::ResolvedBuild;
use crate::core::RpmInfo;
use crate::core::artifact_to_remote_archive;
use crate::core::fix_null_version;
use crate::core::pnc_build_to_resolved;
use crate::interfaces::CacheError;
use crate::interfaces::CatalogError;
use crate::interfaces::KojiCatalog;
use crate::interfaces::PncCatalog;
use crate::interfaces::ResolverCache;
use crate::runtime::gate::ChecksumGate;
use crate::runtime::not_found::add_without_build;
use crate::runtime::not_found::promote;
use crate::runtime::not_found::resolve_parent;
use crate::runtime::result::FinderResult;
use crate::runtime::selector::mark_duplicate_archives;
use crate::runtime::selector::select_best_build;
use crate::runtime::selector::select_best_pnc_artifact;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Checksum-to-filenames table processed per batch.
pub type ChecksumTable = BTreeMap<Checksum, BTreeSet<String>>;

/// Parallel lists returned by the build metadata fan-out.
type MetadataBatch = (
    Vec<Option<crate::core::BuildInfo>>,
    Vec<Vec<crate::core::TagInfo>>,
    Vec<Vec<RemoteArchive>>,
    Vec<Option<crate::core::TaskInfo>>,
);

/// Configuration knobs consumed by the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Digest algorithms to consider; remote resolution uses MD5 only.
    pub checksum_types: BTreeSet<ChecksumType>,
    /// Whitelist of catalog archive-type names; empty means all.
    pub archive_types: Vec<String>,
    /// Whitelist of archive extensions; empty means all known.
    pub archive_extensions: Vec<String>,
    /// Worker pool size for batched catalog fan-out.
    pub num_threads: usize,
    /// Chunk size of one batched catalog round trip.
    pub multicall_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let mut checksum_types = BTreeSet::new();
        checksum_types.insert(ChecksumType::Md5);
        Self {
            checksum_types,
            archive_types: Vec::new(),
            archive_extensions: Vec::new(),
            num_threads: 12,
            multicall_size: 8,
        }
    }
}

/// Analyzer-side context consulted during resolution.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    /// Every checksum the analyzer computed, keyed by filename.
    pub files: BTreeMap<String, BTreeSet<Checksum>>,
    /// Files the analyzer failed to process.
    pub files_in_error: Vec<String>,
}

/// Errors surfaced by the resolution engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A remote catalog failed; the current batch is abandoned.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The persistent cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The remote returned an RPM whose payload hash contradicts the query.
    #[error("mismatched payload hash: {checksum} != {actual}")]
    PayloadMismatch {
        /// The queried checksum.
        checksum: String,
        /// The payload hash the catalog reported.
        actual: String,
    },
}

// ============================================================================
// SECTION: Resolver State
// ============================================================================

/// The build resolution engine.
///
/// All maps are owned and mutated exclusively by the resolver; catalog and
/// cache backends are borrowed for the lifetime of a run.
pub struct BuildResolver<'a> {
    /// Koji catalog backend.
    koji: &'a dyn KojiCatalog,
    /// PNC catalog backend, when the PNC build system is configured.
    pnc: Option<&'a dyn PncCatalog>,
    /// Persistent cache facade, when caching is configured.
    cache: Option<&'a dyn ResolverCache>,
    /// Resolver configuration.
    config: ResolverConfig,
    /// Analyzer context for checksum seeding and error files.
    analysis: AnalysisContext,
    /// Lazily fetched checksum gate.
    gate: Option<ChecksumGate>,
    /// The output map; always contains the synthetic bucket-zero build.
    builds: BTreeMap<BuildKey, ResolvedBuild>,
    /// Working map of every Koji build fetched or cache-loaded this run.
    all_koji_builds: BTreeMap<i32, ResolvedBuild>,
    /// Working map of every PNC build fetched or cache-loaded this run.
    all_pnc_builds: BTreeMap<i32, PncBuild>,
    /// Checksums resolved to a build, with their filenames.
    found_checksums: ChecksumTable,
    /// Checksums with no resolved build, with their filenames.
    not_found_checksums: ChecksumTable,
}

impl<'a> BuildResolver<'a> {
    /// Creates a resolver over the Koji catalog with the given configuration.
    #[must_use]
    pub fn new(koji: &'a dyn KojiCatalog, config: ResolverConfig) -> Self {
        let mut builds = BTreeMap::new();
        builds.insert(BuildKey::NOT_FOUND, ResolvedBuild::not_found());

        Self {
            koji,
            pnc: None,
            cache: None,
            config,
            analysis: AnalysisContext::default(),
            gate: None,
            builds,
            all_koji_builds: BTreeMap::new(),
            all_pnc_builds: BTreeMap::new(),
            found_checksums: ChecksumTable::new(),
            not_found_checksums: ChecksumTable::new(),
        }
    }

    /// Enables the PNC branch of resolution.
    #[must_use]
    pub fn with_pnc(mut self, pnc: &'a dyn PncCatalog) -> Self {
        self.pnc = Some(pnc);
        self
    }

    /// Attaches the persistent cache facade.
    #[must_use]
    pub fn with_cache(mut self, cache: &'a dyn ResolverCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attaches analyzer context.
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisContext) -> Self {
        self.analysis = analysis;
        self
    }

    /// Returns the output map.
    #[must_use]
    pub fn builds_map(&self) -> &BTreeMap<BuildKey, ResolvedBuild> {
        &self.builds
    }

    /// Returns the found-checksum index.
    #[must_use]
    pub fn found_checksums(&self) -> &ChecksumTable {
        &self.found_checksums
    }

    /// Returns the not-found-checksum index.
    #[must_use]
    pub fn not_found_checksums(&self) -> &ChecksumTable {
        &self.not_found_checksums
    }

    /// Finalizes resolution into an immutable result.
    #[must_use]
    pub fn into_result(self) -> FinderResult {
        FinderResult::new(self.builds, self.found_checksums, self.not_found_checksums)
    }

    // ------------------------------------------------------------------
    // Queue drain loop
    // ------------------------------------------------------------------

    /// Drains the analyzer queue until it disconnects, resolving per batch.
    ///
    /// Channel disconnect is the termination sentinel. MD5 records accumulate
    /// into a per-batch table; other digest types ride along in the analyzer
    /// context only.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when a catalog or cache operation fails, or
    /// when remote data contradicts a queried checksum.
    pub fn resolve_queue(&mut self, queue: &Receiver<Checksum>) -> Result<(), ResolveError> {
        let start = Instant::now();

        while let Ok(first) = queue.recv() {
            let mut drained: BTreeSet<Checksum> = BTreeSet::new();
            drained.insert(first);
            drained.extend(queue.try_iter());

            debug!(count = drained.len(), "got checksums from queue");

            let mut table = ChecksumTable::new();

            for checksum in drained {
                if checksum.checksum_type == ChecksumType::Md5 {
                    let filename = checksum.filename.clone();
                    table.entry(checksum).or_default().insert(filename);
                }
            }

            self.resolve_table(&table)?;
        }

        let found = self.builds.len().saturating_sub(1);
        info!(builds = found, elapsed = ?start.elapsed(), "finished finding builds");

        Ok(())
    }

    /// Resolves one batch table through the configured build systems.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when a catalog or cache operation fails.
    pub fn resolve_table(&mut self, table: &ChecksumTable) -> Result<(), ResolveError> {
        if self.pnc.is_some() {
            self.find_builds_pnc(table)?;

            if !self.not_found_checksums.is_empty() {
                let pending = std::mem::take(&mut self.not_found_checksums);
                self.find_builds(&pending)?;
            }
        } else {
            self.find_builds(table)?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Koji resolution
    // ------------------------------------------------------------------

    /// Resolves a checksum table against the Koji catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when a catalog or cache operation fails, or
    /// when an RPM payload hash contradicts the queried checksum.
    pub fn find_builds(&mut self, table: &ChecksumTable) -> Result<(), ResolveError> {
        if table.is_empty() {
            warn!("checksum table is empty");
            return Ok(());
        }

        let gate = self.ensure_gate()?;

        let mut checksums: Vec<(&Checksum, &BTreeSet<String>)> = Vec::with_capacity(table.len());
        let mut cached_checksums: Vec<(&Checksum, &BTreeSet<String>)> = Vec::new();
        let mut cached_archives: Vec<Vec<RemoteArchive>> = Vec::new();
        let mut rpm_entries: Vec<(&Checksum, &BTreeSet<String>)> = Vec::new();

        for (checksum, filenames) in table {
            if gate.should_skip(checksum, filenames) {
                debug!(%checksum, "skipped checksum");
                continue;
            }

            if ChecksumGate::is_rpm_entry(filenames) {
                match self.cached_rpm_build(checksum)? {
                    Some(build) => {
                        debug!(%checksum, build_id = build.build_info.id, "checksum cached");
                        self.recache_rpm_build(checksum, build)?;
                    }
                    None => {
                        debug!(%checksum, "add RPM entry to list");
                        rpm_entries.push((checksum, filenames));
                    }
                }
            } else {
                match self.cached_archive_list(checksum)? {
                    Some(archives) => {
                        debug!(%checksum, count = archives.len(), "checksum cached with archives");
                        cached_checksums.push((checksum, filenames));
                        cached_archives.push(archives);
                    }
                    None => {
                        debug!(%checksum, "add checksum to list");
                        checksums.push((checksum, filenames));
                    }
                }
            }
        }

        let mut archives = self.query_archive_chunks(&checksums)?;
        self.enrich_archive_lists(&mut archives)?;
        self.write_through_archive_lists(&checksums, &archives)?;

        let mut build_ids: BTreeSet<i32> =
            archives.iter().flatten().map(|archive| archive.build_id).collect();
        build_ids.extend(cached_archives.iter().flatten().map(|archive| archive.build_id));

        let to_fetch = self.load_cached_builds(build_ids)?;

        self.resolve_rpm_entries(&rpm_entries)?;
        self.fetch_build_metadata(&to_fetch)?;
        self.enrich_source_archives()?;

        let mut entries = checksums;
        entries.extend(cached_checksums);
        let mut archive_lists = archives;
        archive_lists.append(&mut cached_archives);

        debug!(
            checksums = entries.len(),
            archive_lists = archive_lists.len(),
            "adding builds for resolved archive lists"
        );

        for ((checksum, filenames), archive_list) in entries.iter().copied().zip(&archive_lists) {
            self.attribute_archive_list(checksum, filenames, archive_list);
        }

        self.record_files_in_error();
        self.sweep_not_found_parents();

        Ok(())
    }

    /// Lazily initializes the checksum gate from the catalog.
    fn ensure_gate(&mut self) -> Result<ChecksumGate, ResolveError> {
        if let Some(gate) = &self.gate {
            debug!("getting archive extensions from configuration");
            return Ok(gate.clone());
        }

        debug!("asking server for archive extensions");

        let gate = ChecksumGate::from_catalog(
            self.koji,
            &self.config.archive_types,
            &self.config.archive_extensions,
        )?;
        self.gate = Some(gate.clone());

        Ok(gate)
    }

    /// Reads the cached RPM build for a checksum, when caching is enabled.
    fn cached_rpm_build(&self, checksum: &Checksum) -> Result<Option<ResolvedBuild>, CacheError> {
        match self.cache {
            Some(cache) => cache.rpm_build_by_checksum(ChecksumType::Md5, &checksum.value),
            None => Ok(None),
        }
    }

    /// Re-caches an RPM build under the entry's own digest type.
    fn recache_rpm_build(
        &self,
        checksum: &Checksum,
        build: ResolvedBuild,
    ) -> Result<(), CacheError> {
        if let Some(cache) = self.cache {
            cache.put_build_by_id(build.build_info.id, build.clone())?;
            cache.put_rpm_build_by_checksum(checksum.checksum_type, &checksum.value, build)?;
        }
        Ok(())
    }

    /// Reads the cached archive list for a checksum, when caching is enabled.
    fn cached_archive_list(
        &self,
        checksum: &Checksum,
    ) -> Result<Option<Vec<RemoteArchive>>, CacheError> {
        match self.cache {
            Some(cache) => cache.archives_by_checksum(ChecksumType::Md5, &checksum.value),
            None => Ok(None),
        }
    }

    /// Fans archive lookups out over the worker pool in multicall chunks.
    ///
    /// Results are collected in submission order so the caller can zip them
    /// with the queried checksums for write-through caching.
    fn query_archive_chunks(
        &self,
        checksums: &[(&Checksum, &BTreeSet<String>)],
    ) -> Result<Vec<Vec<RemoteArchive>>, ResolveError> {
        if checksums.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.config.multicall_size.max(1);
        let chunks: Vec<Vec<String>> = checksums
            .chunks(chunk_size)
            .map(|chunk| chunk.iter().map(|(checksum, _)| checksum.value.clone()).collect())
            .collect();
        let num_chunks = chunks.len();
        let num_workers = self.config.num_threads.max(1).min(num_chunks);

        debug!(
            checksums = checksums.len(),
            chunks = num_chunks,
            chunk_size,
            workers = num_workers,
            "looking up checksums"
        );

        let koji = self.koji;
        let mut slots: Vec<Option<Result<Vec<Vec<RemoteArchive>>, CatalogError>>> = Vec::new();
        slots.resize_with(num_chunks, || None);

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(num_workers);

            for worker in 0..num_workers {
                let assigned: Vec<(usize, &Vec<String>)> =
                    chunks.iter().enumerate().skip(worker).step_by(num_workers).collect();

                handles.push(scope.spawn(move || {
                    assigned
                        .into_iter()
                        .map(|(index, values)| {
                            debug!(chunk = index + 1, total = num_chunks, "looking up chunk");
                            (index, koji.list_archives_by_checksums(values))
                        })
                        .collect::<Vec<_>>()
                }));
            }

            for handle in handles {
                for (index, result) in join_scoped(handle) {
                    slots[index] = Some(result);
                }
            }
        });

        let mut archives: Vec<Vec<RemoteArchive>> = Vec::with_capacity(checksums.len());

        for slot in slots {
            match slot {
                Some(result) => archives.extend(result?),
                None => {
                    return Err(ResolveError::Catalog(CatalogError::Protocol(
                        "archive lookup chunk produced no result".to_string(),
                    )))
                }
            }
        }

        if archives.len() != checksums.len() {
            return Err(ResolveError::Catalog(CatalogError::Protocol(format!(
                "archive lookup returned {} lists for {} checksums",
                archives.len(),
                checksums.len()
            ))));
        }

        Ok(archives)
    }

    /// Runs archive type enrichment over every fetched archive.
    fn enrich_archive_lists(
        &self,
        archives: &mut [Vec<RemoteArchive>],
    ) -> Result<(), ResolveError> {
        let lengths: Vec<usize> = archives.iter().map(Vec::len).collect();
        let mut flat: Vec<RemoteArchive> =
            archives.iter().flat_map(|list| list.iter().cloned()).collect();

        if flat.is_empty() {
            return Ok(());
        }

        self.koji.enrich_archive_type_info(&mut flat)?;

        let mut source = flat.into_iter();
        for (list, length) in archives.iter_mut().zip(lengths) {
            *list = source.by_ref().take(length).collect();
        }

        Ok(())
    }

    /// Writes archive lookup results through the cache, empties included.
    fn write_through_archive_lists(
        &self,
        checksums: &[(&Checksum, &BTreeSet<String>)],
        archives: &[Vec<RemoteArchive>],
    ) -> Result<(), ResolveError> {
        for ((checksum, _), archive_list) in checksums.iter().copied().zip(archives) {
            if let Some(first) = archive_list.first() {
                if first.checksum != checksum.value {
                    warn!(
                        queried = %checksum.value,
                        returned = %first.checksum,
                        "checksums do not match, but this should never happen"
                    );
                }
            }

            if let Some(cache) = self.cache {
                cache.put_archives_by_checksum(
                    ChecksumType::Md5,
                    &checksum.value,
                    archive_list.clone(),
                )?;
            }
        }

        Ok(())
    }

    /// Loads cached builds into the working map; returns ids still to fetch.
    fn load_cached_builds(&mut self, build_ids: BTreeSet<i32>) -> Result<Vec<i32>, ResolveError> {
        let mut to_fetch = Vec::with_capacity(build_ids.len());

        for id in build_ids {
            let cached = match self.cache {
                Some(cache) => cache.build_by_id(id)?,
                None => None,
            };

            match cached {
                Some(build) => {
                    debug!(build_id = id, nvr = %build.build_info.nvr(), "build previously cached");
                    self.all_koji_builds.insert(id, build);
                }
                None => to_fetch.push(id),
            }
        }

        Ok(to_fetch)
    }

    /// Resolves RPM entries through NVRA lookup.
    ///
    /// A payload hash that contradicts the queried MD5 is a fatal data
    /// inconsistency; the check runs for the whole batch before any entry
    /// mutates the output map.
    fn resolve_rpm_entries(
        &mut self,
        rpm_entries: &[(&Checksum, &BTreeSet<String>)],
    ) -> Result<(), ResolveError> {
        if rpm_entries.is_empty() {
            return Ok(());
        }

        let mut parsed: Vec<(&Checksum, &BTreeSet<String>, Nvra)> =
            Vec::with_capacity(rpm_entries.len());

        for &(checksum, filenames) in rpm_entries {
            let Some(rpm_filename) = filenames.iter().find(|name| name.ends_with(".rpm")) else {
                continue;
            };

            match Nvra::parse(rpm_filename) {
                Some(nvra) => {
                    debug!(%nvra, "added RPM");
                    parsed.push((checksum, filenames, nvra));
                }
                None => {
                    warn!(%rpm_filename, "could not parse NVRA from RPM filename");
                    self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                    add_without_build(
                        &mut self.builds,
                        &self.analysis.files,
                        checksum,
                        filenames,
                    );
                }
            }
        }

        if parsed.is_empty() {
            return Ok(());
        }

        let nvras: Vec<Nvra> = parsed.iter().map(|(_, _, nvra)| nvra.clone()).collect();
        let rpms = self.koji.get_rpms(&nvras)?;
        expect_parity("getRPM", nvras.len(), rpms.len())?;

        let mut found: Vec<(&Checksum, &BTreeSet<String>, RpmInfo)> =
            Vec::with_capacity(parsed.len());

        for ((checksum, filenames, nvra), rpm) in parsed.into_iter().zip(rpms) {
            match rpm {
                Some(rpm) => found.push((checksum, filenames, rpm)),
                None => {
                    warn!(%nvra, "RPM not found in catalog");
                    self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                    add_without_build(
                        &mut self.builds,
                        &self.analysis.files,
                        checksum,
                        filenames,
                    );
                }
            }
        }

        for (checksum, _, rpm) in &found {
            if checksum.checksum_type == ChecksumType::Md5 && checksum.value != rpm.payloadhash {
                return Err(ResolveError::PayloadMismatch {
                    checksum: checksum.to_string(),
                    actual: rpm.payloadhash.clone(),
                });
            }
        }

        let build_ids: Vec<i32> = found.iter().map(|(_, _, rpm)| rpm.build_id).collect();
        let build_infos = self.koji.get_builds(&build_ids)?;
        let tag_lists = self.koji.list_tags(&build_ids)?;
        let rpm_lists = self.koji.list_rpms_by_builds(&build_ids)?;
        expect_parity("getBuild", build_ids.len(), build_infos.len())?;
        expect_parity("listTags", build_ids.len(), tag_lists.len())?;
        expect_parity("listBuildRPMs", build_ids.len(), rpm_lists.len())?;

        let task_ids: Vec<i32> =
            build_infos.iter().flatten().filter_map(|info| info.task_id).collect();
        let task_infos = if task_ids.is_empty() {
            Vec::new()
        } else {
            self.koji.get_task_info(&task_ids, true)?
        };
        let mut task_iter = task_infos.into_iter();

        let rows = found.into_iter().zip(build_infos).zip(tag_lists).zip(rpm_lists);

        for ((((checksum, filenames, rpm), build_info), tags), remote_rpms) in rows {
            let Some(build_info) = build_info else {
                warn!(
                    build_id = rpm.build_id,
                    "build not found for RPM, but this is never supposed to happen"
                );
                self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                add_without_build(&mut self.builds, &self.analysis.files, checksum, filenames);
                continue;
            };

            let mut build = ResolvedBuild::new(build_info);
            build.tags = tags;
            build.remote_rpms = remote_rpms;

            if build.build_info.task_id.is_some() {
                build.task_info = task_iter.next().flatten();
            }

            add_rpm_to_build(&mut build, rpm.clone(), filenames, &self.analysis.files);

            info!(
                id = build.build_info.id,
                nvr = %build.build_info.nvr(),
                %checksum,
                archive = %rpm.filename(),
                "found build in Koji"
            );

            self.found_checksums.insert(checksum.clone(), filenames.clone());
            self.not_found_checksums.remove(checksum);
            promote(&mut self.builds, checksum);

            let id = build.build_info.id;
            self.all_koji_builds.insert(id, build.clone());

            if let Some(cache) = self.cache {
                let previous = cache.put_build_by_id(id, build.clone())?;
                if previous
                    .is_some_and(|cached| !cached.build_info.type_names.contains("rpm"))
                {
                    warn!(build_id = id, "build was already cached, but this should never happen");
                }
                cache.put_rpm_build_by_checksum(
                    checksum.checksum_type,
                    &checksum.value,
                    build.clone(),
                )?;
            }

            self.builds.insert(BuildKey::koji(id), build);
        }

        Ok(())
    }

    /// Fetches canonical metadata for builds missing from the working map.
    ///
    /// Builds, tags, and per-build archive lists are fetched as parallel
    /// tasks; task metadata follows once the task ids are known.
    fn fetch_build_metadata(&mut self, build_ids: &[i32]) -> Result<(), ResolveError> {
        if build_ids.is_empty() {
            return Ok(());
        }

        let koji = self.koji;

        let fetched: Result<MetadataBatch, CatalogError> = thread::scope(|scope| {
            let tags_handle = scope.spawn(move || koji.list_tags(build_ids));
            let archives_handle = scope.spawn(move || koji.list_archives_by_builds(build_ids));

            let build_infos = koji.get_builds(build_ids)?;
            let task_ids: Vec<i32> =
                build_infos.iter().flatten().filter_map(|info| info.task_id).collect();
            let task_handle = if task_ids.is_empty() {
                None
            } else {
                Some(scope.spawn(move || koji.get_task_info(&task_ids, true)))
            };

            let tag_lists = join_scoped(tags_handle)?;
            let archive_lists = join_scoped(archives_handle)?;
            let task_infos = match task_handle {
                Some(handle) => join_scoped(handle)?,
                None => Vec::new(),
            };

            Ok((build_infos, tag_lists, archive_lists, task_infos))
        });
        let (build_infos, tag_lists, archive_lists, task_infos) = fetched?;

        expect_parity("getBuild", build_ids.len(), build_infos.len())?;
        expect_parity("listTags", build_ids.len(), tag_lists.len())?;
        expect_parity("listArchives", build_ids.len(), archive_lists.len())?;

        let mut task_iter = task_infos.into_iter();

        for ((build_info, tags), remote_archives) in
            build_infos.into_iter().zip(tag_lists).zip(archive_lists)
        {
            let Some(build_info) = build_info else {
                warn!("build not found, but this is never supposed to happen");
                continue;
            };

            let mut build = ResolvedBuild::new(build_info);
            build.tags = tags;
            build.remote_archives = remote_archives;

            if build.build_info.task_id.is_some() {
                build.task_info = task_iter.next().flatten();
            }

            let id = build.build_info.id;

            if let Some(cache) = self.cache {
                let previous = cache.put_build_by_id(id, build.clone())?;
                if previous.is_some() {
                    warn!(build_id = id, "build was already cached, but this should never happen");
                }
            }

            self.all_koji_builds.insert(id, build);
        }

        Ok(())
    }

    /// Enriches source archives on working builds that lack type info.
    fn enrich_source_archives(&mut self) -> Result<(), ResolveError> {
        let mut updates: Vec<(i32, usize)> = Vec::new();
        let mut batch: Vec<RemoteArchive> = Vec::new();

        for (id, build) in &self.all_koji_builds {
            for index in build.source_archives_missing_type_info() {
                updates.push((*id, index));
                batch.push(build.remote_archives[index].clone());
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        self.koji.enrich_archive_type_info(&mut batch)?;

        let mut touched: BTreeSet<i32> = BTreeSet::new();

        for ((id, index), enriched) in updates.into_iter().zip(batch) {
            if let Some(build) = self.all_koji_builds.get_mut(&id) {
                build.remote_archives[index] = enriched;
                touched.insert(id);
            }
        }

        if let Some(cache) = self.cache {
            for id in touched {
                if let Some(build) = self.all_koji_builds.get(&id) {
                    cache.put_build_by_id(id, build.clone())?;
                }
            }
        }

        Ok(())
    }

    /// Decides the fate of one checksum given its matched archive list.
    fn attribute_archive_list(
        &mut self,
        checksum: &Checksum,
        filenames: &BTreeSet<String>,
        archive_list: &[RemoteArchive],
    ) {
        match archive_list {
            [] => {
                debug!(%checksum, "got empty archive list for checksum");
                self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                add_without_build(&mut self.builds, &self.analysis.files, checksum, filenames);
            }
            [archive] => {
                debug!(build_id = archive.build_id, %checksum, "singular build found");
                self.attribute_archive(checksum, filenames, archive, archive_list);
            }
            _ => {
                let candidate_ids: Vec<i32> = archive_list
                    .iter()
                    .map(|archive| archive.build_id)
                    .collect::<BTreeSet<i32>>()
                    .into_iter()
                    .filter(|id| self.all_koji_builds.contains_key(id))
                    .collect();

                if candidate_ids.is_empty() {
                    warn!(%checksum, "no candidate builds exist for archive matches");
                    self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                    add_without_build(
                        &mut self.builds,
                        &self.analysis.files,
                        checksum,
                        filenames,
                    );
                    return;
                }

                let best_id = if let [only] = candidate_ids.as_slice() {
                    *only
                } else {
                    mark_duplicate_archives(
                        &mut self.builds,
                        &mut self.all_koji_builds,
                        archive_list,
                    );

                    let candidates: Vec<&ResolvedBuild> = candidate_ids
                        .iter()
                        .filter_map(|id| self.all_koji_builds.get(id))
                        .collect();

                    select_best_build(&self.builds, &candidates, archive_list)
                };
                debug!(build_id = best_id, %checksum, "best build selected");

                let Some(archive) =
                    archive_list.iter().find(|archive| archive.build_id == best_id)
                else {
                    return;
                };

                self.attribute_archive(checksum, filenames, archive, archive_list);
            }
        }
    }

    /// Promotes a build if needed and attaches the archive to it.
    fn attribute_archive(
        &mut self,
        checksum: &Checksum,
        filenames: &BTreeSet<String>,
        archive: &RemoteArchive,
        archive_list: &[RemoteArchive],
    ) {
        let key = BuildKey::koji(archive.build_id);

        if !self.builds.contains_key(&key) {
            if let Some(promoted) = self.all_koji_builds.get(&archive.build_id) {
                let archive_filenames: Vec<&str> = archive_list
                    .iter()
                    .filter(|candidate| candidate.build_id == archive.build_id)
                    .map(|candidate| candidate.filename.as_str())
                    .collect();

                info!(
                    id = promoted.build_info.id,
                    nvr = %promoted.build_info.nvr(),
                    %checksum,
                    archive = %archive_filenames.join(", "),
                    "found build in Koji"
                );

                self.builds.insert(key, promoted.clone());
                self.found_checksums.insert(checksum.clone(), filenames.clone());
                self.not_found_checksums.remove(checksum);
                promote(&mut self.builds, checksum);
            }
        }

        if let Some(build) = self.builds.get_mut(&key) {
            add_archive_to_build(build, archive.clone(), filenames, &self.analysis.files);
        } else {
            warn!(
                archive_id = archive.archive_id,
                ?filenames,
                "null build when adding archive"
            );
            self.not_found_checksums.insert(checksum.clone(), filenames.clone());
            add_without_build(&mut self.builds, &self.analysis.files, checksum, filenames);
        }
    }

    /// Adds bucket-zero entries for every file the analyzer failed on.
    fn record_files_in_error(&mut self) {
        for filename in &self.analysis.files_in_error {
            let Some(checksums) = self.analysis.files.get(filename) else {
                continue;
            };
            let Some(checksum) = Checksum::find_by_type(checksums, ChecksumType::Md5) else {
                continue;
            };

            let mut filenames = BTreeSet::new();
            filenames.insert(filename.clone());

            add_without_build(
                &mut self.builds,
                &self.analysis.files,
                &checksum.clone(),
                &filenames,
            );
        }
    }

    /// Attributes nested not-found files to resolved parents, then prunes.
    ///
    /// A filename is pruned from bucket zero whenever any resolved archive
    /// claims it as a nested member, the distribution root included; the
    /// parent's unmatched set keeps the file visible for auditing, so
    /// nothing is ever listed both as unresolved and as owned content.
    fn sweep_not_found_parents(&mut self) {
        let bucket_len = self
            .builds
            .get(&BuildKey::NOT_FOUND)
            .map(|bucket| bucket.archives.len())
            .unwrap_or_default();

        debug!(archives = bucket_len, "finding parents for not-found archives");

        for index in 0..bucket_len {
            let filenames: Vec<String> = match self.builds.get(&BuildKey::NOT_FOUND) {
                Some(bucket) => bucket.archives[index].filenames.iter().cloned().collect(),
                None => Vec::new(),
            };

            for filename in filenames {
                if resolve_parent(&mut self.builds, &filename).is_some() {
                    debug!(%filename, "removing file since a parent was found elsewhere");
                    if let Some(bucket) = self.builds.get_mut(&BuildKey::NOT_FOUND) {
                        bucket.archives[index].filenames.remove(&filename);
                    }
                } else {
                    debug!(%filename, "keeping file since no parent archive was found");
                }
            }
        }

        if let Some(bucket) = self.builds.get_mut(&BuildKey::NOT_FOUND) {
            bucket.archives.retain(|archive| !archive.filenames.is_empty());
        }
    }

    // ------------------------------------------------------------------
    // PNC resolution
    // ------------------------------------------------------------------

    /// Resolves a checksum table against the PNC catalog.
    ///
    /// Lookup is by MD5 only. Checksums the catalog does not know fall into
    /// the not-found index so the caller can retry them against Koji.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when a catalog or cache operation fails.
    pub fn find_builds_pnc(&mut self, table: &ChecksumTable) -> Result<(), ResolveError> {
        let Some(pnc) = self.pnc else {
            return Ok(());
        };

        if table.is_empty() {
            warn!("checksum table is empty");
            return Ok(());
        }

        let gate = self.ensure_gate()?;

        let mut entries: Vec<(&Checksum, &BTreeSet<String>)> = Vec::with_capacity(table.len());
        let mut cached: Vec<Option<Vec<PncArtifact>>> = Vec::with_capacity(table.len());
        let mut misses: Vec<String> = Vec::new();

        for (checksum, filenames) in table {
            if gate.should_skip(checksum, filenames) {
                debug!(%checksum, "skipped checksum");
                continue;
            }

            let hit = match self.cache {
                Some(cache) => {
                    cache.pnc_artifacts_by_checksum(ChecksumType::Md5, &checksum.value)?
                }
                None => None,
            };

            if hit.is_none() && checksum.checksum_type == ChecksumType::Md5 {
                misses.push(checksum.value.clone());
            }

            entries.push((checksum, filenames));
            cached.push(hit);
        }

        let results = if misses.is_empty() {
            Vec::new()
        } else {
            pnc.get_artifacts_by_md5(&misses)?
        };
        expect_parity("getArtifactsByMd5", misses.len(), results.len())?;
        let mut result_iter = results.into_iter();

        let mut artifact_lists: Vec<Vec<PncArtifact>> = Vec::with_capacity(entries.len());

        for ((checksum, _), hit) in entries.iter().copied().zip(cached) {
            let artifacts = match hit {
                Some(artifacts) => {
                    debug!(%checksum, "found checksum in PNC artifact cache");
                    artifacts
                }
                None => {
                    let artifacts = if checksum.checksum_type == ChecksumType::Md5 {
                        result_iter.next().unwrap_or_default()
                    } else {
                        Vec::new()
                    };

                    if let Some(cache) = self.cache {
                        cache.put_pnc_artifacts_by_checksum(
                            checksum.checksum_type,
                            &checksum.value,
                            artifacts.clone(),
                        )?;
                    }

                    artifacts
                }
            };

            artifact_lists.push(artifacts);
        }

        let mut record_ids: BTreeSet<i32> = BTreeSet::new();

        for ((checksum, filenames), artifacts) in entries.iter().copied().zip(&artifact_lists) {
            if artifacts.is_empty() {
                self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                continue;
            }

            let best = select_best_pnc_artifact(artifacts);
            let Some(record_id) = best.build_record_ids.first() else {
                continue;
            };

            let cached_build = match self.cache {
                Some(cache) => cache.pnc_build_by_id(*record_id)?,
                None => None,
            };

            if cached_build.is_none() && !self.all_pnc_builds.contains_key(record_id) {
                record_ids.insert(*record_id);
            }
        }

        self.fetch_pnc_builds(pnc, record_ids)?;

        for ((checksum, filenames), artifacts) in entries.iter().copied().zip(&artifact_lists) {
            if artifacts.is_empty() {
                continue;
            }

            let best = select_best_pnc_artifact(artifacts);
            debug!(artifact = best.id, "best PNC artifact selected");

            let Some(record_id) = best.build_record_ids.first().copied() else {
                self.not_found_checksums.insert(checksum.clone(), filenames.clone());
                continue;
            };

            let pnc_build = match self.cache {
                Some(cache) => match cache.pnc_build_by_id(record_id)? {
                    Some(build) => {
                        debug!(record_id, "found build in PNC build cache");
                        Some(build)
                    }
                    None => self.all_pnc_builds.get(&record_id).cloned(),
                },
                None => self.all_pnc_builds.get(&record_id).cloned(),
            };

            let Some(mut pnc_build) = pnc_build else {
                self.not_found_checksums.insert((*checksum).clone(), (*filenames).clone());
                continue;
            };

            if !pnc_build.artifacts.iter().any(|artifact| artifact.id == best.id) {
                pnc_build.artifacts.push(best.clone());
            }

            let key = BuildKey::pnc(record_id);

            if !self.builds.contains_key(&key) {
                self.builds.insert(key, pnc_build_to_resolved(&pnc_build));
            }

            let archive = artifact_to_remote_archive(&pnc_build, best);

            if let Some(resolved) = self.builds.get_mut(&key) {
                fix_null_version(resolved);
                add_archive_to_build(resolved, archive, filenames, &self.analysis.files);

                info!(
                    id = record_id,
                    nvr = %pnc_build.nvr(),
                    %checksum,
                    archive = %best.filename,
                    "found build in Pnc"
                );
            }

            self.found_checksums.insert(checksum.clone(), filenames.clone());
            self.not_found_checksums.remove(checksum);
            promote(&mut self.builds, checksum);

            if let Some(cache) = self.cache {
                cache.put_pnc_build_by_id(record_id, pnc_build.clone())?;
            }

            self.all_pnc_builds.insert(record_id, pnc_build);
        }

        Ok(())
    }

    /// Fetches PNC build records and their related entities in one pass.
    fn fetch_pnc_builds(
        &mut self,
        pnc: &dyn PncCatalog,
        record_ids: BTreeSet<i32>,
    ) -> Result<(), ResolveError> {
        if record_ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<i32> = record_ids.into_iter().collect();
        let records = pnc.get_build_records(&ids)?;
        expect_parity("getBuildRecordsById", ids.len(), records.len())?;
        let built_artifacts = pnc.get_built_artifacts(&ids)?;
        expect_parity("getBuiltArtifactsById", ids.len(), built_artifacts.len())?;

        let configuration_ids: Vec<i32> = records
            .iter()
            .map(|record| record.build_configuration_id)
            .collect::<BTreeSet<i32>>()
            .into_iter()
            .collect();
        let configurations = pnc.get_build_configurations(&configuration_ids)?;

        let product_version_ids: Vec<i32> = configurations
            .iter()
            .filter_map(|configuration| configuration.product_version_id)
            .collect::<BTreeSet<i32>>()
            .into_iter()
            .collect();
        let product_versions = pnc.get_product_versions(&product_version_ids)?;

        let push_results = pnc.get_build_record_push_results(&ids)?;

        let configuration_map: BTreeMap<i32, _> = configurations
            .into_iter()
            .map(|configuration| (configuration.id, configuration))
            .collect();
        let product_version_map: BTreeMap<i32, _> = product_versions
            .into_iter()
            .map(|product_version| (product_version.id, product_version))
            .collect();
        let push_map: BTreeMap<i32, _> = push_results
            .into_iter()
            .flatten()
            .map(|push| (push.build_record_id, push))
            .collect();

        for (record, artifacts) in records.into_iter().zip(built_artifacts) {
            let record_id = record.id;
            let mut pnc_build = PncBuild::new(record);

            pnc_build.push_result = push_map.get(&record_id).cloned();
            pnc_build.build_configuration = configuration_map
                .get(&pnc_build.build_record.build_configuration_id)
                .cloned();

            if let Some(product_version_id) = pnc_build
                .build_configuration
                .as_ref()
                .and_then(|configuration| configuration.product_version_id)
            {
                pnc_build.product_version =
                    product_version_map.get(&product_version_id).cloned();
            }

            pnc_build.artifacts = artifacts;

            self.all_pnc_builds.insert(record_id, pnc_build);
        }

        Ok(())
    }
}

// ============================================================================
// SECTION: Attribution Helpers
// ============================================================================

/// Attaches an archive to a build, merging filenames on repeat matches.
fn add_archive_to_build(
    build: &mut ResolvedBuild,
    archive: RemoteArchive,
    filenames: &BTreeSet<String>,
    files: &BTreeMap<String, BTreeSet<Checksum>>,
) {
    debug!(
        build_id = build.build_info.id,
        archive = %archive.filename,
        checksum = %archive.checksum,
        ?filenames,
        "found build for archive matching local files"
    );

    let existing = build.archives.iter_mut().find(|local| {
        matches!(local.archive, ArchiveRef::Archive(_))
            && local.archive.archive_id() == archive.archive_id
    });

    if let Some(existing) = existing {
        existing.filenames.extend(filenames.iter().cloned());
        return;
    }

    let checksums = seed_checksums(filenames, files);
    build
        .archives
        .push(LocalArchive::new(ArchiveRef::Archive(archive), filenames.clone(), checksums));
    build.archives.sort_by_key(|local| local.archive.filename());
}

/// Attaches an RPM to a build, merging filenames on repeat matches.
fn add_rpm_to_build(
    build: &mut ResolvedBuild,
    rpm: RpmInfo,
    filenames: &BTreeSet<String>,
    files: &BTreeMap<String, BTreeSet<Checksum>>,
) {
    debug!(
        build_id = build.build_info.id,
        rpm = %rpm.nvr,
        payloadhash = %rpm.payloadhash,
        ?filenames,
        "found build for RPM matching local files"
    );

    let existing = build.archives.iter_mut().find(|local| {
        matches!(local.archive, ArchiveRef::Rpm(_)) && local.archive.archive_id() == rpm.id
    });

    if let Some(existing) = existing {
        existing.filenames.extend(filenames.iter().cloned());
        return;
    }

    let checksums = seed_checksums(filenames, files);
    build.archives.push(LocalArchive::new(ArchiveRef::Rpm(rpm), filenames.clone(), checksums));
    build.archives.sort_by_key(|local| local.archive.filename());
}

/// Seeds a local archive's checksum set from the analyzer file map.
fn seed_checksums(
    filenames: &BTreeSet<String>,
    files: &BTreeMap<String, BTreeSet<Checksum>>,
) -> BTreeSet<Checksum> {
    filenames
        .iter()
        .next()
        .and_then(|filename| files.get(filename))
        .cloned()
        .unwrap_or_default()
}

/// Joins a scoped worker, propagating panics.
fn join_scoped<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Validates list-in/list-out parity of a batched catalog response.
fn expect_parity(operation: &str, expected: usize, actual: usize) -> Result<(), CatalogError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CatalogError::Protocol(format!(
            "{operation} returned {actual} results for {expected} inputs"
        )))
    }
}
