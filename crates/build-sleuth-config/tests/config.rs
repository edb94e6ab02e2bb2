// build-sleuth-config/tests/config.rs
// ============================================================================
// Module: Configuration Tests
// Description: Loading, defaults, and validation of SleuthConfig.
// ============================================================================

//! ## Overview
//! Verifies the default configuration, TOML round trips, range validation,
//! and the URL requirements tied to enabled build systems.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::use_debug,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;

use build_sleuth_config::ConfigError;
use build_sleuth_config::SleuthConfig;
use build_sleuth_core::BuildSystem;
use build_sleuth_core::ChecksumType;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Defaults target Koji with MD5 checksums and moderate concurrency.
#[test]
fn defaults_are_sensible() {
    let config = SleuthConfig::default();

    assert!(config.checksum_types.contains(&ChecksumType::Md5));
    assert_eq!(config.build_systems, vec![BuildSystem::Koji]);
    assert_eq!(config.koji_num_threads, 12);
    assert_eq!(config.koji_multicall_size, 8);
    assert!(config.cache_dir.is_none());
    assert!(!config.pnc_enabled());
}

/// A missing config file yields defaults; validation then requires the hub URL.
#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");

    let config = SleuthConfig::load(Some(&path)).unwrap();
    assert_eq!(config, SleuthConfig::default());
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// A complete TOML file parses and validates.
#[test]
fn full_config_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build-sleuth.toml");
    fs::write(
        &path,
        r#"
checksum_types = ["md5", "sha256"]
archive_types = ["jar"]
archive_extensions = ["jar"]
build_systems = ["koji", "pnc"]
koji_hub_url = "https://koji.example.com/hub/"
pnc_url = "https://pnc.example.com/"
koji_num_threads = 4
koji_multicall_size = 16
output_dir = "out"
"#,
    )
    .unwrap();

    let config = SleuthConfig::load(Some(&path)).unwrap();
    config.validate().unwrap();
    assert_eq!(config.checksum_types.len(), 2);
    assert_eq!(config.koji_num_threads, 4);
    assert!(config.pnc_enabled());

    let resolver = config.resolver_config();
    assert_eq!(resolver.multicall_size, 16);
    assert_eq!(resolver.num_threads, 4);
}

/// Unknown fields are rejected.
#[test]
fn unknown_fields_fail_closed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build-sleuth.toml");
    fs::write(
        &path,
        r#"
koji_hub_url = "https://koji.example.com/hub/"
surprise = true
"#,
    )
    .unwrap();

    assert!(matches!(SleuthConfig::load(Some(&path)), Err(ConfigError::Parse(_))));
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Thread counts outside the permitted range are rejected.
#[test]
fn thread_count_range_is_enforced() {
    let mut config = SleuthConfig {
        koji_hub_url: Some("https://koji.example.com/hub/".to_string()),
        ..SleuthConfig::default()
    };

    config.koji_num_threads = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    config.koji_num_threads = 65;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    config.koji_num_threads = 12;
    config.validate().unwrap();
}

/// Enabling PNC without a URL is rejected.
#[test]
fn pnc_requires_url() {
    let config = SleuthConfig {
        koji_hub_url: Some("https://koji.example.com/hub/".to_string()),
        build_systems: vec![BuildSystem::Koji, BuildSystem::Pnc],
        ..SleuthConfig::default()
    };

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

/// Malformed catalog URLs are rejected.
#[test]
fn malformed_urls_are_rejected() {
    let config = SleuthConfig {
        koji_hub_url: Some("not a url".to_string()),
        ..SleuthConfig::default()
    };

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

/// An empty checksum type set is rejected.
#[test]
fn empty_checksum_types_are_rejected() {
    let config = SleuthConfig {
        koji_hub_url: Some("https://koji.example.com/hub/".to_string()),
        checksum_types: Default::default(),
        ..SleuthConfig::default()
    };

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

/// The default configuration renders to TOML and parses back.
#[test]
fn default_config_round_trips_through_toml() {
    let config = SleuthConfig {
        koji_hub_url: Some("https://koji.example.com/hub/".to_string()),
        ..SleuthConfig::default()
    };

    let text = config.to_toml_string().unwrap();
    let reparsed: SleuthConfig = toml::from_str(&text).unwrap();
    assert_eq!(reparsed, config);
}
