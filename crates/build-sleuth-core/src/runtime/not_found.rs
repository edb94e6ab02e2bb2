// build-sleuth-core/src/runtime/not_found.rs
// ============================================================================
// Module: Not-Found Tracker
// Description: Maintenance of the synthetic bucket-zero build.
// Purpose: Track unresolved content and attribute nested files to parents.
// Dependencies: crate::core, tracing
// ============================================================================

//! ## Overview
//! Content that resolves to no upstream build lands in the synthetic build
//! with id 0, as negative-id placeholder archives. Successful resolutions
//! promote checksums back out of the bucket, and nested filenames whose
//! enclosing archive did resolve are attributed to that parent as unmatched
//! files instead of staying unresolved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;

use crate::core::ArchiveRef;
use crate::core::BuildKey;
use crate::core::Checksum;
use crate::core::LocalArchive;
use crate::core::NOT_FOUND;
use crate::core::RemoteArchive;
use crate::core::ResolvedBuild;

// ============================================================================
// SECTION: Bucket Zero Maintenance
// ============================================================================

/// Records an unresolved checksum in the synthetic bucket-zero build.
///
/// When a placeholder archive already carries the checksum its filename set
/// is extended; otherwise a new placeholder with the next negative archive id
/// is created, seeded with the analyzer's full checksum set for the file.
pub fn add_without_build(
    builds: &mut BTreeMap<BuildKey, ResolvedBuild>,
    files: &BTreeMap<String, BTreeSet<Checksum>>,
    checksum: &Checksum,
    filenames: &BTreeSet<String>,
) {
    let Some(bucket) = builds.get_mut(&BuildKey::NOT_FOUND) else {
        return;
    };

    if let Some(existing) = bucket
        .archives
        .iter_mut()
        .find(|archive| archive.archive.matches_checksum(checksum))
    {
        debug!(
            %checksum,
            archive_id = existing.archive.archive_id(),
            "extending existing not-found archive"
        );
        existing.filenames.extend(filenames.iter().cloned());
        return;
    }

    let placeholder = RemoteArchive {
        archive_id: -(i32::try_from(bucket.archives.len()).unwrap_or(i32::MAX - 1) + 1),
        build_id: 0,
        filename: NOT_FOUND.to_string(),
        checksum: checksum.value.clone(),
        checksum_type: checksum.checksum_type,
        btype: None,
        type_extensions: None,
    };

    debug!(%checksum, archive_id = placeholder.archive_id, "adding not-found archive");

    let mut checksums = filenames
        .iter()
        .next()
        .and_then(|filename| files.get(filename))
        .cloned()
        .unwrap_or_default();
    checksums.insert(checksum.clone());

    bucket.archives.push(LocalArchive::new(
        ArchiveRef::Archive(placeholder),
        filenames.clone(),
        checksums,
    ));
    bucket.archives.sort_by_key(|archive| archive.archive.filename());
}

/// Removes bucket-zero archives carrying the given checksum.
///
/// Called after every successful resolution so content never stays in both
/// the not-found bucket and a real build.
pub fn promote(builds: &mut BTreeMap<BuildKey, ResolvedBuild>, checksum: &Checksum) {
    let Some(bucket) = builds.get_mut(&BuildKey::NOT_FOUND) else {
        return;
    };

    bucket.archives.retain(|archive| {
        !archive.checksums.iter().any(|candidate| {
            candidate.checksum_type == checksum.checksum_type
                && candidate.value == checksum.value
        })
    });
}

// ============================================================================
// SECTION: Parent Attribution
// ============================================================================

/// Walks a nested filename upward looking for a resolved enclosing archive.
///
/// Splits on the last `!/` at each level. When an archive in the output map
/// carries the parent filename, the examined filename is recorded in its
/// unmatched set and the parent is returned. Returns `None` when no level
/// has a resolved parent. Any `Some` return means an enclosing archive now
/// accounts for the file, single-level parents included; callers treat that
/// as grounds to drop the file from bucket zero.
pub fn resolve_parent(
    builds: &mut BTreeMap<BuildKey, ResolvedBuild>,
    filename: &str,
) -> Option<String> {
    let index = filename.rfind("!/").unwrap_or(filename.len());
    let parent = &filename[..index];

    debug!(filename, parent, "resolving parent of not-found file");

    for build in builds.values_mut() {
        if let Some(matched) =
            build.archives.iter_mut().find(|archive| archive.filenames.contains(parent))
        {
            debug!(
                archive_id = matched.archive.archive_id(),
                filename, "parent archive contains unfound file"
            );
            matched.add_unmatched(filename);
            return Some(parent.to_string());
        }
    }

    if index == filename.len() {
        return None;
    }

    resolve_parent(builds, parent)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
