// build-sleuth-catalog/src/pnc.rs
// ============================================================================
// Module: PNC Catalog
// Description: Blocking client for the PNC build system.
// Purpose: Implement the PncCatalog contract over the JSON gateway.
// Dependencies: build-sleuth-core, crate::http, serde_json
// ============================================================================

//! ## Overview
//! PNC lookups follow the artifact-to-build-record chain: artifacts by MD5,
//! then records, configurations, product versions, push results, and built
//! artifacts by identifier. Each operation is one POST with a batched body;
//! responses keep list-in/list-out parity where the contract requires it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use build_sleuth_core::core::BuildConfiguration;
use build_sleuth_core::core::BuildRecord;
use build_sleuth_core::core::PncArtifact;
use build_sleuth_core::core::ProductVersion;
use build_sleuth_core::core::PushResult;
use build_sleuth_core::interfaces::CatalogError;
use build_sleuth_core::interfaces::PncCatalog;
use serde_json::json;

use crate::http::GatewayConfig;
use crate::http::JsonGateway;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration of the PNC client.
#[derive(Debug, Clone)]
pub struct PncRestConfig {
    /// Transport configuration.
    pub gateway: GatewayConfig,
}

impl PncRestConfig {
    /// Creates a configuration with transport defaults for the PNC URL.
    #[must_use]
    pub fn new(base_url: url::Url) -> Self {
        Self {
            gateway: GatewayConfig::new(base_url),
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking PNC client.
pub struct PncRestCatalog {
    /// JSON transport.
    gateway: JsonGateway,
}

impl PncRestCatalog {
    /// Creates a PNC client.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the transport cannot be constructed.
    pub fn new(config: PncRestConfig) -> Result<Self, CatalogError> {
        Ok(Self {
            gateway: JsonGateway::new(config.gateway)?,
        })
    }

    /// Validates list-in/list-out parity of a batched response.
    fn expect_parity<T>(
        operation: &str,
        inputs: usize,
        outputs: &[T],
    ) -> Result<(), CatalogError> {
        if inputs == outputs.len() {
            Ok(())
        } else {
            Err(CatalogError::Protocol(format!(
                "{operation} returned {} results for {inputs} inputs",
                outputs.len()
            )))
        }
    }
}

impl PncCatalog for PncRestCatalog {
    fn get_artifacts_by_md5(
        &self,
        values: &[String],
    ) -> Result<Vec<Vec<PncArtifact>>, CatalogError> {
        let lists: Vec<Vec<PncArtifact>> =
            self.gateway.post("getArtifactsByMd5", &json!({ "values": values }))?;
        Self::expect_parity("getArtifactsByMd5", values.len(), &lists)?;
        Ok(lists)
    }

    fn get_build_records(&self, ids: &[i32]) -> Result<Vec<BuildRecord>, CatalogError> {
        self.gateway.post("getBuildRecordsById", &json!({ "ids": ids }))
    }

    fn get_build_configurations(
        &self,
        ids: &[i32],
    ) -> Result<Vec<BuildConfiguration>, CatalogError> {
        self.gateway.post("getBuildConfigurationsById", &json!({ "ids": ids }))
    }

    fn get_product_versions(&self, ids: &[i32]) -> Result<Vec<ProductVersion>, CatalogError> {
        self.gateway.post("getProductVersionsById", &json!({ "ids": ids }))
    }

    fn get_build_record_push_results(
        &self,
        ids: &[i32],
    ) -> Result<Vec<Option<PushResult>>, CatalogError> {
        let results: Vec<Option<PushResult>> = self
            .gateway
            .post("getBuildRecordPushResultsById", &json!({ "ids": ids }))?;
        Self::expect_parity("getBuildRecordPushResultsById", ids.len(), &results)?;
        Ok(results)
    }

    fn get_built_artifacts(&self, ids: &[i32]) -> Result<Vec<Vec<PncArtifact>>, CatalogError> {
        let lists: Vec<Vec<PncArtifact>> =
            self.gateway.post("getBuiltArtifactsById", &json!({ "ids": ids }))?;
        Self::expect_parity("getBuiltArtifactsById", ids.len(), &lists)?;
        Ok(lists)
    }
}
