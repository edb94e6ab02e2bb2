// build-sleuth-core/src/core/build.rs
// ============================================================================
// Module: Build Types
// Description: Build identity, state, and resolved-build records.
// Purpose: Provide the canonical output shape of the resolution engine.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ResolvedBuild`] is the unit of output: one upstream build together with
//! the local archives attributed to it. Builds are keyed by [`BuildKey`],
//! which pairs the originating build system with the numeric identifier so
//! that the two remote identifier spaces never collide. The synthetic key
//! `(None, 0)` names the bucket of content for which no build was found.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::archive::LocalArchive;
use crate::core::archive::RemoteArchive;
use crate::core::archive::RpmInfo;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder name, version, and release of the synthetic not-found build.
pub const NOT_FOUND: &str = "not found";

/// Filename suffixes of source archives that may lack type information.
const SOURCE_ARCHIVE_SUFFIXES: [&str; 3] =
    ["-scm-sources.zip", "-project-sources.tar.gz", "-patches.zip"];

// ============================================================================
// SECTION: Build Identity
// ============================================================================

/// Remote build systems known to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    /// No build system; reserved for the synthetic not-found bucket.
    None,
    /// The Koji build system.
    Koji,
    /// The PNC build system.
    Pnc,
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Koji => "koji",
            Self::Pnc => "pnc",
        };
        f.write_str(name)
    }
}

impl FromStr for BuildSystem {
    type Err = ParseBuildKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "koji" => Ok(Self::Koji),
            "pnc" => Ok(Self::Pnc),
            _ => Err(ParseBuildKeyError(value.to_string())),
        }
    }
}

/// Error parsing the `id:system` string form of a build key.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid build key: {0}")]
pub struct ParseBuildKeyError(String);

/// Key of a build in the output map: build system plus numeric identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildKey {
    /// Build system that owns the identifier.
    pub system: BuildSystem,
    /// Numeric build identifier within the system.
    pub id: i32,
}

impl BuildKey {
    /// The synthetic bucket collecting unresolved content.
    pub const NOT_FOUND: Self = Self {
        system: BuildSystem::None,
        id: 0,
    };

    /// Creates a key for a Koji build.
    #[must_use]
    pub const fn koji(id: i32) -> Self {
        Self {
            system: BuildSystem::Koji,
            id,
        }
    }

    /// Creates a key for a PNC build.
    #[must_use]
    pub const fn pnc(id: i32) -> Self {
        Self {
            system: BuildSystem::Pnc,
            id,
        }
    }
}

impl Ord for BuildKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id).then_with(|| self.system.cmp(&other.system))
    }
}

impl PartialOrd for BuildKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BuildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.system)
    }
}

impl FromStr for BuildKey {
    type Err = ParseBuildKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (id, system) = value
            .split_once(':')
            .ok_or_else(|| ParseBuildKeyError(value.to_string()))?;
        let id: i32 = id.parse().map_err(|_| ParseBuildKeyError(value.to_string()))?;
        let system: BuildSystem = system.parse()?;

        Ok(Self {
            system,
            id,
        })
    }
}

// ============================================================================
// SECTION: Build State
// ============================================================================

/// Lifecycle state of a remote build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    /// Build in progress.
    Building,
    /// Build finished successfully.
    Complete,
    /// Build deleted from the catalog.
    Deleted,
    /// Build failed.
    Failed,
    /// Build canceled.
    Canceled,
    /// Wildcard state used only by the synthetic not-found build.
    All,
}

impl BuildState {
    /// Returns the catalog integer code for the state.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Building => 0,
            Self::Complete => 1,
            Self::Deleted => 2,
            Self::Failed => 3,
            Self::Canceled => 4,
            Self::All => -1,
        }
    }
}

// ============================================================================
// SECTION: Build Metadata
// ============================================================================

/// Canonical metadata of one remote build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Numeric build identifier.
    pub id: i32,
    /// Package identifier the build belongs to.
    pub package_id: i32,
    /// Build lifecycle state.
    pub state: BuildState,
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package release.
    pub release: String,
    /// Task identifier when the build was produced by a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i32>,
    /// Build type names attached by the catalog.
    #[serde(default)]
    pub type_names: BTreeSet<String>,
}

impl BuildInfo {
    /// Returns the name-version-release string of the build.
    #[must_use]
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }
}

/// A catalog tag attached to a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag identifier.
    pub id: i32,
    /// Tag name.
    pub name: String,
}

/// Task metadata of a build produced from source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Task identifier.
    pub task_id: i32,
    /// Task method name.
    pub method: String,
    /// Raw task request when fetched with requests enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
}

// ============================================================================
// SECTION: Resolved Build
// ============================================================================

/// One upstream build together with the local content attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBuild {
    /// Canonical build metadata.
    pub build_info: BuildInfo,
    /// Tags attached to the build, in catalog order.
    #[serde(default)]
    pub tags: Vec<TagInfo>,
    /// All archives the catalog records for the build.
    #[serde(default)]
    pub remote_archives: Vec<RemoteArchive>,
    /// All RPMs the catalog records for the build.
    #[serde(default)]
    pub remote_rpms: Vec<RpmInfo>,
    /// Task metadata when the build has an originating task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_info: Option<TaskInfo>,
    /// Local archives matched to this build, sorted by archive filename.
    #[serde(default)]
    pub archives: Vec<LocalArchive>,
    /// Archives matching a checksum that was attributed to another build.
    #[serde(default)]
    pub duplicate_archives: Vec<RemoteArchive>,
}

impl ResolvedBuild {
    /// Creates a resolved build from its canonical metadata.
    #[must_use]
    pub fn new(build_info: BuildInfo) -> Self {
        Self {
            build_info,
            tags: Vec::new(),
            remote_archives: Vec::new(),
            remote_rpms: Vec::new(),
            task_info: None,
            archives: Vec::new(),
            duplicate_archives: Vec::new(),
        }
    }

    /// Creates the synthetic not-found build.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(BuildInfo {
            id: 0,
            package_id: 0,
            state: BuildState::All,
            name: NOT_FOUND.to_string(),
            version: NOT_FOUND.to_string(),
            release: NOT_FOUND.to_string(),
            task_id: None,
            type_names: BTreeSet::new(),
        })
    }

    /// Returns true when the build has at least one tag.
    #[must_use]
    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Returns true when the build was side-loaded rather than built.
    ///
    /// An imported build has neither an originating task nor task metadata.
    #[must_use]
    pub fn is_import(&self) -> bool {
        self.build_info.task_id.is_none() && self.task_info.is_none()
    }

    /// Indices of remote source archives that still lack type information.
    #[must_use]
    pub fn source_archives_missing_type_info(&self) -> Vec<usize> {
        self.remote_archives
            .iter()
            .enumerate()
            .filter(|(_, archive)| {
                archive.missing_type_info()
                    && SOURCE_ARCHIVE_SUFFIXES
                        .iter()
                        .any(|suffix| archive.filename.ends_with(suffix))
            })
            .map(|(index, _)| index)
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
