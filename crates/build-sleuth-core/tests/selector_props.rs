// build-sleuth-core/tests/selector_props.rs
// ============================================================================
// Module: Selector Property Tests
// Description: Property-based checks of the candidate selection policy.
// ============================================================================

//! ## Overview
//! The selector must be a pure function of the candidate set and the output
//! map: same inputs, same choice. These properties also pin the ranking
//! rules themselves against arbitrary candidate sets.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use build_sleuth_core::BuildInfo;
use build_sleuth_core::BuildKey;
use build_sleuth_core::BuildState;
use build_sleuth_core::ResolvedBuild;
use build_sleuth_core::TagInfo;
use build_sleuth_core::TaskInfo;
use build_sleuth_core::runtime::select_best_build;
use proptest::prelude::*;

// ============================================================================
// SECTION: Generators
// ============================================================================

/// One generated candidate: id, state, tagged, imported.
#[derive(Debug, Clone)]
struct CandidateSpec {
    id: i32,
    state: BuildState,
    tagged: bool,
    import: bool,
}

fn candidate_strategy() -> impl Strategy<Value = CandidateSpec> {
    (
        1..10_000i32,
        prop_oneof![
            Just(BuildState::Building),
            Just(BuildState::Complete),
            Just(BuildState::Deleted),
            Just(BuildState::Failed),
            Just(BuildState::Canceled),
        ],
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(id, state, tagged, import)| CandidateSpec {
            id,
            state,
            tagged,
            import,
        })
}

fn candidates_strategy() -> impl Strategy<Value = Vec<CandidateSpec>> {
    prop::collection::vec(candidate_strategy(), 1..8).prop_map(|mut specs| {
        specs.sort_by_key(|spec| spec.id);
        specs.dedup_by_key(|spec| spec.id);
        specs
    })
}

fn materialize(spec: &CandidateSpec) -> ResolvedBuild {
    let mut build = ResolvedBuild::new(BuildInfo {
        id: spec.id,
        package_id: spec.id,
        state: spec.state,
        name: format!("pkg-{}", spec.id),
        version: "1".to_string(),
        release: "1".to_string(),
        task_id: None,
        type_names: BTreeSet::new(),
    });

    if spec.tagged {
        build.tags.push(TagInfo {
            id: spec.id,
            name: "tag".to_string(),
        });
    }

    if !spec.import {
        build.build_info.task_id = Some(spec.id);
        build.task_info = Some(TaskInfo {
            task_id: spec.id,
            method: "build".to_string(),
            request: None,
        });
    }

    build
}

fn empty_output() -> BTreeMap<BuildKey, ResolvedBuild> {
    let mut builds = BTreeMap::new();
    builds.insert(BuildKey::NOT_FOUND, ResolvedBuild::not_found());
    builds
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    /// The same candidate set always yields the same choice.
    #[test]
    fn selection_is_deterministic(specs in candidates_strategy()) {
        let builds = empty_output();
        let candidates: Vec<ResolvedBuild> = specs.iter().map(materialize).collect();
        let refs: Vec<&ResolvedBuild> = candidates.iter().collect();

        let first = select_best_build(&builds, &refs, &[]);
        let second = select_best_build(&builds, &refs, &[]);
        prop_assert_eq!(first, second);
    }

    /// The choice is always a member of the candidate set.
    #[test]
    fn selection_is_a_candidate(specs in candidates_strategy()) {
        let builds = empty_output();
        let candidates: Vec<ResolvedBuild> = specs.iter().map(materialize).collect();
        let refs: Vec<&ResolvedBuild> = candidates.iter().collect();

        let chosen = select_best_build(&builds, &refs, &[]);
        prop_assert!(specs.iter().any(|spec| spec.id == chosen));
    }

    /// When a complete tagged non-import exists, the highest such id wins.
    #[test]
    fn best_tier_wins_when_present(specs in candidates_strategy()) {
        let builds = empty_output();
        let candidates: Vec<ResolvedBuild> = specs.iter().map(materialize).collect();
        let refs: Vec<&ResolvedBuild> = candidates.iter().collect();

        let best_tier: Option<i32> = specs
            .iter()
            .filter(|spec| {
                spec.state == BuildState::Complete && spec.tagged && !spec.import
            })
            .map(|spec| spec.id)
            .max();

        let chosen = select_best_build(&builds, &refs, &[]);

        if specs.len() > 1 {
            if let Some(expected) = best_tier {
                prop_assert_eq!(chosen, expected);
            }
        }
    }

    /// A candidate already in the output map pre-empts every ranking rule.
    #[test]
    fn output_membership_preempts(specs in candidates_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(specs.len() > 1);

        let cached = &specs[pick.index(specs.len())];
        let mut builds = empty_output();
        builds.insert(BuildKey::koji(cached.id), materialize(cached));

        let candidates: Vec<ResolvedBuild> = specs.iter().map(materialize).collect();
        let refs: Vec<&ResolvedBuild> = candidates.iter().collect();

        let chosen = select_best_build(&builds, &refs, &[]);
        prop_assert_eq!(chosen, cached.id);
    }
}
