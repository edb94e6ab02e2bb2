// build-sleuth-config/src/config.rs
// ============================================================================
// Module: Build Sleuth Configuration
// Description: Configuration loading and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: build-sleuth-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! validated before use. Catalog URLs are only required for the build systems
//! that are actually enabled, and every knob has a bounded range so a typo
//! cannot spin up a thousand worker threads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use build_sleuth_core::core::BuildSystem;
use build_sleuth_core::core::ChecksumType;
use build_sleuth_core::runtime::ResolverConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "build-sleuth.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BUILD_SLEUTH_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Minimum worker pool size.
const MIN_NUM_THREADS: usize = 1;
/// Maximum worker pool size.
const MAX_NUM_THREADS: usize = 64;
/// Minimum multicall chunk size.
const MIN_MULTICALL_SIZE: usize = 1;
/// Maximum multicall chunk size.
const MAX_MULTICALL_SIZE: usize = 1_000;
/// Default worker pool size.
const DEFAULT_NUM_THREADS: usize = 12;
/// Default multicall chunk size.
const DEFAULT_MULTICALL_SIZE: usize = 8;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Build Sleuth configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SleuthConfig {
    /// Digest algorithms to consider.
    #[serde(default = "default_checksum_types")]
    pub checksum_types: BTreeSet<ChecksumType>,
    /// Whitelist of catalog archive-type names; empty means all.
    #[serde(default)]
    pub archive_types: Vec<String>,
    /// Whitelist of archive extensions; empty means all known.
    #[serde(default)]
    pub archive_extensions: Vec<String>,
    /// Filename patterns the analyzer excludes from source checks.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Build systems to resolve against.
    #[serde(default = "default_build_systems")]
    pub build_systems: Vec<BuildSystem>,
    /// Koji hub URL; required when the Koji build system is enabled.
    #[serde(default)]
    pub koji_hub_url: Option<String>,
    /// Koji web URL used by report links.
    #[serde(default)]
    pub koji_web_url: Option<String>,
    /// PNC URL; enables the PNC branch when non-empty.
    #[serde(default)]
    pub pnc_url: Option<String>,
    /// Worker pool size for batched catalog fan-out.
    #[serde(default = "default_num_threads")]
    pub koji_num_threads: usize,
    /// Chunk size of one batched catalog round trip.
    #[serde(default = "default_multicall_size")]
    pub koji_multicall_size: usize,
    /// Directory holding the persistent cache maps; none disables caching.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Directory receiving output files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for SleuthConfig {
    fn default() -> Self {
        Self {
            checksum_types: default_checksum_types(),
            archive_types: Vec::new(),
            archive_extensions: Vec::new(),
            excludes: Vec::new(),
            build_systems: default_build_systems(),
            koji_hub_url: None,
            koji_web_url: None,
            pnc_url: None,
            koji_num_threads: default_num_threads(),
            koji_multicall_size: default_multicall_size(),
            cache_dir: None,
            output_dir: default_output_dir(),
        }
    }
}

impl SleuthConfig {
    /// Loads configuration from the given path, or defaults when absent.
    ///
    /// The path falls back to `BUILD_SLEUTH_CONFIG`, then to the default
    /// filename in the working directory. Callers apply their overrides and
    /// then run [`SleuthConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(path) => path.to_path_buf(),
            None => env::var(CONFIG_ENV_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME)),
        };

        if !resolved.exists() {
            return Ok(Self::default());
        }

        let metadata = fs::metadata(&resolved)?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "config file {} exceeds {} bytes",
                resolved.display(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = fs::read_to_string(&resolved)?;
        let config: Self = toml::from_str(&text)?;

        Ok(config)
    }

    /// Validates field ranges and cross-field requirements.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checksum_types.is_empty() {
            return Err(ConfigError::Invalid(
                "checksum_types must not be empty".to_string(),
            ));
        }

        if !(MIN_NUM_THREADS..=MAX_NUM_THREADS).contains(&self.koji_num_threads) {
            return Err(ConfigError::Invalid(format!(
                "koji_num_threads must be between {MIN_NUM_THREADS} and {MAX_NUM_THREADS}"
            )));
        }

        if !(MIN_MULTICALL_SIZE..=MAX_MULTICALL_SIZE).contains(&self.koji_multicall_size) {
            return Err(ConfigError::Invalid(format!(
                "koji_multicall_size must be between {MIN_MULTICALL_SIZE} and {MAX_MULTICALL_SIZE}"
            )));
        }

        if self.build_systems.contains(&BuildSystem::None) {
            return Err(ConfigError::Invalid(
                "build_systems must name koji or pnc".to_string(),
            ));
        }

        if self.build_systems.contains(&BuildSystem::Koji) {
            let url = self
                .koji_hub_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    ConfigError::Invalid(
                        "koji_hub_url is required when the koji build system is enabled"
                            .to_string(),
                    )
                })?;
            validate_url("koji_hub_url", url)?;
        }

        if let Some(url) = self.koji_web_url.as_deref().filter(|url| !url.is_empty()) {
            validate_url("koji_web_url", url)?;
        }

        if self.pnc_enabled() {
            let url = self
                .pnc_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    ConfigError::Invalid(
                        "pnc_url is required when the pnc build system is enabled".to_string(),
                    )
                })?;
            validate_url("pnc_url", url)?;
        }

        Ok(())
    }

    /// Returns true when the PNC branch of resolution is enabled.
    #[must_use]
    pub fn pnc_enabled(&self) -> bool {
        self.build_systems.contains(&BuildSystem::Pnc)
            && self.pnc_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Converts the catalog knobs into the resolver configuration.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            checksum_types: self.checksum_types.clone(),
            archive_types: self.archive_types.clone(),
            archive_extensions: self.archive_extensions.clone(),
            num_threads: self.koji_num_threads,
            multicall_size: self.koji_multicall_size,
        }
    }

    /// Renders the configuration as TOML for writing a default file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|error| ConfigError::Invalid(error.to_string()))
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default digest algorithm set.
fn default_checksum_types() -> BTreeSet<ChecksumType> {
    let mut types = BTreeSet::new();
    types.insert(ChecksumType::Md5);
    types
}

/// Returns the default build system set.
fn default_build_systems() -> Vec<BuildSystem> {
    vec![BuildSystem::Koji]
}

/// Returns the default worker pool size.
const fn default_num_threads() -> usize {
    DEFAULT_NUM_THREADS
}

/// Returns the default multicall chunk size.
const fn default_multicall_size() -> usize {
    DEFAULT_MULTICALL_SIZE
}

/// Returns the default output directory.
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates that a configured URL parses.
fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|error| ConfigError::Invalid(format!("{key} is malformed: {error}")))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file I/O error.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Config contents failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}
