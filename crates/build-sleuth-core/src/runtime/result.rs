// build-sleuth-core/src/runtime/result.rs
// ============================================================================
// Module: Finder Result
// Description: Immutable views over a finished resolution run.
// Purpose: Expose the output map, ordered build lists, and checksum indexes.
// Dependencies: crate::{core, runtime}, serde_json
// ============================================================================

//! ## Overview
//! Once the queue drains, the resolver state freezes into a [`FinderResult`].
//! The build list is ordered by numeric id ascending; the found-only list
//! excludes the synthetic bucket-zero build. The output map serializes to a
//! JSON object keyed by the `id:system` string form of each build key, the
//! shape persisted as `builds.json` between runs; keeping the system in the
//! key means the two remote identifier spaces never collide on reload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::BuildKey;
use crate::core::ResolvedBuild;
use crate::runtime::resolver::ChecksumTable;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Filename of the persisted output map.
pub const BUILDS_FILENAME: &str = "builds.json";

// ============================================================================
// SECTION: Finder Result
// ============================================================================

/// Immutable outcome of a resolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderResult {
    /// The output map, including the synthetic bucket-zero build.
    builds: BTreeMap<BuildKey, ResolvedBuild>,
    /// Checksums resolved to a build.
    found_checksums: ChecksumTable,
    /// Checksums with no resolved build.
    not_found_checksums: ChecksumTable,
}

impl FinderResult {
    /// Freezes resolver state into a result.
    #[must_use]
    pub fn new(
        builds: BTreeMap<BuildKey, ResolvedBuild>,
        found_checksums: ChecksumTable,
        not_found_checksums: ChecksumTable,
    ) -> Self {
        Self {
            builds,
            found_checksums,
            not_found_checksums,
        }
    }

    /// Returns the output map.
    #[must_use]
    pub fn builds_map(&self) -> &BTreeMap<BuildKey, ResolvedBuild> {
        &self.builds
    }

    /// Returns every build ordered by numeric id ascending.
    #[must_use]
    pub fn builds(&self) -> Vec<&ResolvedBuild> {
        self.builds.values().collect()
    }

    /// Returns the found builds, excluding the synthetic bucket zero.
    #[must_use]
    pub fn builds_found(&self) -> Vec<&ResolvedBuild> {
        self.builds
            .iter()
            .filter(|(key, _)| **key != BuildKey::NOT_FOUND)
            .map(|(_, build)| build)
            .collect()
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
}

// ============================================================================
// SECTION: Output Map Serialization
// ============================================================================

/// Serializes an output map as a JSON object keyed by `id:system`.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when serialization fails.
pub fn builds_to_json(
    builds: &BTreeMap<BuildKey, ResolvedBuild>,
) -> Result<String, serde_json::Error> {
    let keyed: BTreeMap<String, &ResolvedBuild> =
        builds.iter().map(|(key, build)| (key.to_string(), build)).collect();
    serde_json::to_string_pretty(&keyed)
}

/// Reloads an output map from its persisted JSON form.
///
/// Both halves of every `id:system` key are parsed back, so a PNC build
/// never reloads under the Koji identifier space.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when deserialization fails or a map key is
/// not a valid build key.
pub fn builds_from_json(
    json: &str,
) -> Result<BTreeMap<BuildKey, ResolvedBuild>, serde_json::Error> {
    let keyed: BTreeMap<String, ResolvedBuild> = serde_json::from_str(json)?;

    let mut builds = BTreeMap::new();
    for (key, build) in keyed {
        let key: BuildKey = key.parse().map_err(serde::de::Error::custom)?;
        builds.insert(key, build);
    }

    Ok(builds)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildInfo;
    use crate::core::BuildState;
    use std::collections::BTreeSet;

    fn build(id: i32) -> ResolvedBuild {
        ResolvedBuild::new(BuildInfo {
            id,
            package_id: 1,
            state: BuildState::Complete,
            name: format!("pkg-{id}"),
            version: "1".to_string(),
            release: "1".to_string(),
            task_id: None,
            type_names: BTreeSet::new(),
        })
    }

    fn sample_map() -> BTreeMap<BuildKey, ResolvedBuild> {
        let mut builds = BTreeMap::new();
        builds.insert(BuildKey::NOT_FOUND, ResolvedBuild::not_found());
        builds.insert(BuildKey::koji(30), build(30));
        builds.insert(BuildKey::pnc(30), build(30));
        builds.insert(BuildKey::koji(7), build(7));
        builds.insert(BuildKey::pnc(500), build(500));
        builds
    }

    #[test]
    fn build_lists_are_ordered_and_found_excludes_bucket_zero() {
        let result =
            FinderResult::new(sample_map(), ChecksumTable::new(), ChecksumTable::new());

        let ids: Vec<i32> =
            result.builds().iter().map(|build| build.build_info.id).collect();
        assert_eq!(ids, vec![0, 7, 30, 30, 500]);

        let found_ids: Vec<i32> =
            result.builds_found().iter().map(|build| build.build_info.id).collect();
        assert_eq!(found_ids, vec![7, 30, 30, 500]);
    }

    #[test]
    fn output_map_round_trips_through_json() {
        let builds = sample_map();
        let json = builds_to_json(&builds).unwrap();
        let reloaded = builds_from_json(&json).unwrap();

        assert_eq!(reloaded.len(), builds.len());
        for (key, build) in &builds {
            let other = reloaded.get(key).unwrap();
            assert_eq!(other.build_info.id, build.build_info.id);
            assert_eq!(other.archives, build.archives);
        }
    }

    #[test]
    fn pnc_keys_keep_their_system_across_reload() {
        let builds = sample_map();
        let json = builds_to_json(&builds).unwrap();
        let reloaded = builds_from_json(&json).unwrap();

        assert!(reloaded.contains_key(&BuildKey::pnc(500)));
        assert!(!reloaded.contains_key(&BuildKey::koji(500)));
        assert!(reloaded.contains_key(&BuildKey::koji(30)));
        assert!(reloaded.contains_key(&BuildKey::pnc(30)));
    }

    #[test]
    fn malformed_keys_fail_to_reload() {
        let mut builds = BTreeMap::new();
        builds.insert(BuildKey::koji(7), build(7));

        let json = builds_to_json(&builds).unwrap().replace("7:koji", "7");
        assert!(builds_from_json(&json).is_err());
    }
}
