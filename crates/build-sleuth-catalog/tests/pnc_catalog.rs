// build-sleuth-catalog/tests/pnc_catalog.rs
// ============================================================================
// Module: PNC Catalog Tests
// Description: Decoding and parity behavior of the PNC client.
// ============================================================================

//! ## Overview
//! Tests the PNC client for artifact lookup decoding, quality parsing of
//! unknown labels, and parity enforcement on batched replies.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::use_debug,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use build_sleuth_catalog::GatewayConfig;
use build_sleuth_catalog::PncRestCatalog;
use build_sleuth_catalog::PncRestConfig;
use build_sleuth_core::ArtifactQuality;
use build_sleuth_core::CatalogError;
use build_sleuth_core::PncCatalog;
use url::Url;

use crate::common::one_response;
use crate::common::spawn_server;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Creates a PNC client for the local test server.
fn local_catalog(base_url: &str) -> PncRestCatalog {
    let mut gateway = GatewayConfig::new(Url::parse(base_url).unwrap());
    gateway.allow_http = true;

    PncRestCatalog::new(PncRestConfig {
        gateway,
    })
    .unwrap()
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Artifact lookups decode records and qualities.
#[test]
fn artifact_lookup_decodes_records() {
    let body = r#"[[{"id":2,"filename":"widget.jar","quality":"VERIFIED","build_record_ids":[500],"md5":"ppp"}]]"#;
    let (url, _seen, handle) = spawn_server(one_response("getArtifactsByMd5", body), 1);

    let catalog = local_catalog(&url);
    let lists = catalog.get_artifacts_by_md5(&["ppp".to_string()]).unwrap();

    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0][0].id, 2);
    assert_eq!(lists[0][0].quality, ArtifactQuality::Verified);
    assert_eq!(lists[0][0].build_record_ids, vec![500]);

    handle.join().unwrap();
}

/// Unknown quality labels decode to the unknown rank.
#[test]
fn unknown_quality_decodes_to_unknown() {
    let body = r#"[[{"id":3,"filename":"odd.jar","quality":"IMPORTED","build_record_ids":[],"md5":"qqq"}]]"#;
    let (url, _seen, handle) = spawn_server(one_response("getArtifactsByMd5", body), 1);

    let catalog = local_catalog(&url);
    let lists = catalog.get_artifacts_by_md5(&["qqq".to_string()]).unwrap();

    assert_eq!(lists[0][0].quality, ArtifactQuality::Unknown);
    handle.join().unwrap();
}

/// Build record lookups decode optional execution root fields.
#[test]
fn build_record_lookup_decodes() {
    let body = r#"[{"id":500,"build_configuration_id":7,"execution_root_name":"org.acme:widget","execution_root_version":"2.0"}]"#;
    let (url, _seen, handle) = spawn_server(one_response("getBuildRecordsById", body), 1);

    let catalog = local_catalog(&url);
    let records = catalog.get_build_records(&[500]).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].build_configuration_id, 7);
    assert_eq!(records[0].execution_root_name.as_deref(), Some("org.acme:widget"));

    handle.join().unwrap();
}

// ============================================================================
// SECTION: Contract Violations
// ============================================================================

/// A response with the wrong cardinality is a protocol error.
#[test]
fn artifact_parity_violation_is_protocol_error() {
    let body = r#"[[],[]]"#;
    let (url, _seen, handle) = spawn_server(one_response("getArtifactsByMd5", body), 1);

    let catalog = local_catalog(&url);
    let outcome = catalog.get_artifacts_by_md5(&["only".to_string()]);

    assert!(matches!(outcome, Err(CatalogError::Protocol(_))));
    handle.join().unwrap();
}
