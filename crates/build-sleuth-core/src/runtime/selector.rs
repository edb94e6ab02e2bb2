// build-sleuth-core/src/runtime/selector.rs
// ============================================================================
// Module: Candidate Selector
// Description: Deterministic choice of one build among several claimants.
// Purpose: Enforce the tie-breaking policy when many builds share content.
// Dependencies: crate::core, tracing
// ============================================================================

//! ## Overview
//! Many builds can legitimately contain the same bytes (rebuilds, imports,
//! repackaging). The selector prefers, in order: a build already present in
//! the output map, then complete tagged non-imported builds, then complete
//! tagged builds, then any complete build, then whatever has the highest id.
//! Given the same candidate set and output map, the choice is deterministic.
//! Before selection, every matching archive is recorded as a duplicate on
//! the build that owns it, so contested content stays visible in reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::debug;
use tracing::warn;

use crate::core::BuildKey;
use crate::core::BuildState;
use crate::core::PncArtifact;
use crate::core::RemoteArchive;
use crate::core::ResolvedBuild;

// ============================================================================
// SECTION: Duplicate Marking
// ============================================================================

/// Records contested archives as duplicates on the builds that own them.
///
/// The output map wins when a build appears in both maps; marks applied to
/// the working map travel with the build if it is promoted later.
pub fn mark_duplicate_archives(
    builds: &mut BTreeMap<BuildKey, ResolvedBuild>,
    all_koji_builds: &mut BTreeMap<i32, ResolvedBuild>,
    archives: &[RemoteArchive],
) {
    for archive in archives {
        let owner = match builds.get_mut(&BuildKey::koji(archive.build_id)) {
            Some(build) => Some(build),
            None => all_koji_builds.get_mut(&archive.build_id),
        };

        if let Some(build) = owner {
            if !build.duplicate_archives.contains(archive) {
                debug!(
                    archive_id = archive.archive_id,
                    build_id = archive.build_id,
                    "marking archive as duplicate"
                );
                build.duplicate_archives.push(archive.clone());
            }
        }
    }
}

// ============================================================================
// SECTION: Build Selection
// ============================================================================

/// Chooses the best build from candidates sorted by id ascending.
///
/// `archives` are the remote archives that matched the query; the candidate
/// list holds one build per distinct owning id. Returns the chosen build
/// identifier.
#[must_use]
pub fn select_best_build(
    builds: &BTreeMap<BuildKey, ResolvedBuild>,
    candidates: &[&ResolvedBuild],
    archives: &[RemoteArchive],
) -> i32 {
    if let [only] = candidates {
        return only.build_info.id;
    }

    let checksum = archives.first().map(|archive| archive.checksum.as_str()).unwrap_or_default();

    debug!(
        candidates = candidates.len(),
        checksum, "selecting best build among candidates"
    );

    let cached: Vec<i32> = candidates
        .iter()
        .map(|candidate| candidate.build_info.id)
        .filter(|id| builds.contains_key(&BuildKey::koji(*id)))
        .collect();

    if let Some(id) = cached.last() {
        debug!(build_id = id, "found suitable cached build");
        return *id;
    }

    let complete: Vec<&ResolvedBuild> = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.build_info.state == BuildState::Complete)
        .collect();
    let tagged: Vec<&ResolvedBuild> =
        complete.iter().copied().filter(|candidate| candidate.is_tagged()).collect();
    let built: Vec<&ResolvedBuild> =
        tagged.iter().copied().filter(|candidate| !candidate.is_import()).collect();

    if let Some(best) = built.last() {
        debug!(
            build_id = best.build_info.id,
            checksum, "selected complete non-import tagged build"
        );
        return best.build_info.id;
    }

    if let Some(best) = tagged.last() {
        debug!(build_id = best.build_info.id, checksum, "selected complete tagged build");
        return best.build_info.id;
    }

    if let Some(best) = complete.last() {
        debug!(build_id = best.build_info.id, checksum, "selected complete build");
        return best.build_info.id;
    }

    let last = candidates[candidates.len() - 1];

    warn!(
        build_id = last.build_info.id,
        checksum, "could not find suitable build; keeping latest"
    );

    last.build_info.id
}

// ============================================================================
// SECTION: PNC Artifact Selection
// ============================================================================

/// Chooses the best artifact from a non-empty PNC artifact list.
///
/// The highest-quality artifact carrying at least one build record wins;
/// when no artifact has a build record, the first artifact is returned.
#[must_use]
pub fn select_best_pnc_artifact(artifacts: &[PncArtifact]) -> &PncArtifact {
    if let [only] = artifacts {
        return only;
    }

    let mut ranked: Vec<&PncArtifact> = artifacts.iter().collect();
    ranked.sort_by_key(|artifact| std::cmp::Reverse(artifact.quality.score()));

    ranked
        .into_iter()
        .find(|artifact| !artifact.build_record_ids.is_empty())
        .unwrap_or(&artifacts[0])
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactQuality;
    use crate::core::BuildInfo;
    use crate::core::ChecksumType;
    use crate::core::TagInfo;
    use crate::core::TaskInfo;
    use std::collections::BTreeSet;

    fn build(id: i32, state: BuildState, tagged: bool, import: bool) -> ResolvedBuild {
        let mut resolved = ResolvedBuild::new(BuildInfo {
            id,
            package_id: 1,
            state,
            name: format!("pkg-{id}"),
            version: "1".to_string(),
            release: "1".to_string(),
            task_id: None,
            type_names: BTreeSet::new(),
        });

        if tagged {
            resolved.tags.push(TagInfo {
                id,
                name: "release".to_string(),
            });
        }

        if !import {
            resolved.build_info.task_id = Some(id * 10);
            resolved.task_info = Some(TaskInfo {
                task_id: id * 10,
                method: "build".to_string(),
                request: None,
            });
        }

        resolved
    }

    fn archive_for(build_id: i32, checksum: &str) -> RemoteArchive {
        RemoteArchive {
            archive_id: build_id * 100,
            build_id,
            filename: format!("a-{build_id}.jar"),
            checksum: checksum.to_string(),
            checksum_type: ChecksumType::Md5,
            btype: None,
            type_extensions: None,
        }
    }

    fn empty_output() -> BTreeMap<BuildKey, ResolvedBuild> {
        let mut builds = BTreeMap::new();
        builds.insert(BuildKey::NOT_FOUND, ResolvedBuild::not_found());
        builds
    }

    #[test]
    fn prefers_complete_tagged_non_import() {
        let candidates = vec![
            build(50, BuildState::Failed, true, false),
            build(60, BuildState::Complete, false, false),
            build(70, BuildState::Complete, true, true),
            build(80, BuildState::Complete, true, false),
        ];
        let refs: Vec<&ResolvedBuild> = candidates.iter().collect();
        let archives: Vec<RemoteArchive> =
            candidates.iter().map(|b| archive_for(b.build_info.id, "d1")).collect();

        let builds = empty_output();
        assert_eq!(select_best_build(&builds, &refs, &archives), 80);
    }

    #[test]
    fn cached_candidate_preempts_policy() {
        let sixty = build(60, BuildState::Complete, false, false);
        let eighty = build(80, BuildState::Complete, true, false);
        let archives = vec![archive_for(60, "d2"), archive_for(80, "d2")];

        let mut builds = empty_output();
        builds.insert(BuildKey::koji(60), sixty.clone());

        let refs = vec![&sixty, &eighty];
        assert_eq!(select_best_build(&builds, &refs, &archives), 60);
    }

    #[test]
    fn duplicate_marking_targets_output_then_working_map() {
        let archives = vec![archive_for(60, "d2"), archive_for(80, "d2")];

        let mut builds = empty_output();
        builds.insert(BuildKey::koji(60), build(60, BuildState::Complete, false, false));

        let mut all_koji_builds = BTreeMap::new();
        all_koji_builds.insert(80, build(80, BuildState::Complete, true, false));

        mark_duplicate_archives(&mut builds, &mut all_koji_builds, &archives);

        let output = builds.get(&BuildKey::koji(60)).unwrap();
        assert_eq!(output.duplicate_archives.len(), 1);
        assert_eq!(output.duplicate_archives[0].build_id, 60);

        let working = all_koji_builds.get(&80).unwrap();
        assert_eq!(working.duplicate_archives.len(), 1);
        assert_eq!(working.duplicate_archives[0].build_id, 80);

        mark_duplicate_archives(&mut builds, &mut all_koji_builds, &archives);
        assert_eq!(builds.get(&BuildKey::koji(60)).unwrap().duplicate_archives.len(), 1);
    }

    #[test]
    fn falls_back_to_highest_id_with_no_complete_builds() {
        let candidates = vec![
            build(10, BuildState::Failed, false, true),
            build(20, BuildState::Deleted, false, true),
        ];
        let refs: Vec<&ResolvedBuild> = candidates.iter().collect();

        let builds = empty_output();
        assert_eq!(select_best_build(&builds, &refs, &[]), 20);
    }

    #[test]
    fn single_candidate_short_circuits() {
        let only = build(5, BuildState::Failed, false, true);
        let builds = empty_output();
        assert_eq!(select_best_build(&builds, &[&only], &[]), 5);
    }

    fn artifact(id: i32, quality: ArtifactQuality, records: Vec<i32>) -> PncArtifact {
        PncArtifact {
            id,
            filename: format!("artifact-{id}.jar"),
            quality,
            build_record_ids: records,
            md5: "aa".to_string(),
        }
    }

    #[test]
    fn pnc_selection_prefers_quality_with_build_records() {
        let artifacts = vec![
            artifact(1, ArtifactQuality::Tested, vec![]),
            artifact(2, ArtifactQuality::Verified, vec![9]),
            artifact(3, ArtifactQuality::New, vec![8]),
        ];
        assert_eq!(select_best_pnc_artifact(&artifacts).id, 2);
    }

    #[test]
    fn pnc_selection_falls_back_to_first() {
        let artifacts = vec![
            artifact(1, ArtifactQuality::Deprecated, vec![]),
            artifact(2, ArtifactQuality::Tested, vec![]),
        ];
        assert_eq!(select_best_pnc_artifact(&artifacts).id, 1);
    }
}
