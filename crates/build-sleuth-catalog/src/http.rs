// build-sleuth-catalog/src/http.rs
// ============================================================================
// Module: JSON Gateway
// Description: Bounded blocking HTTP transport shared by catalog clients.
// Purpose: Issue JSON-in/JSON-out catalog calls with strict limits.
// Dependencies: build-sleuth-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! Both catalog clients speak the same transport: one POST per logical
//! operation, a JSON request body, and a JSON response read under a hard
//! byte limit. Redirects are never followed and cleartext HTTP must be
//! opted into, so a misconfigured catalog URL fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use build_sleuth_core::interfaces::CatalogError;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Transport configuration shared by the catalog clients.
///
/// # Invariants
///
/// - `allow_http = false` blocks cleartext `http://` URLs.
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the catalog endpoint.
    pub base_url: Url,
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl GatewayConfig {
    /// Creates a configuration with defaults for the given base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            allow_http: false,
            timeout_ms: 30_000,
            max_response_bytes: 16 * 1024 * 1024,
            user_agent: "build-sleuth/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Bounded JSON-over-HTTP transport.
#[derive(Debug)]
pub struct JsonGateway {
    /// Transport configuration.
    config: GatewayConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl JsonGateway {
    /// Creates a gateway, validating the base URL scheme.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the URL scheme is not permitted or the
    /// HTTP client cannot be created.
    pub fn new(config: GatewayConfig) -> Result<Self, CatalogError> {
        match config.base_url.scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            scheme => {
                return Err(CatalogError::Transport(format!(
                    "unsupported catalog url scheme: {scheme}"
                )))
            }
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|error| CatalogError::Transport(error.to_string()))?;

        Ok(Self {
            config,
            client,
        })
    }

    /// Issues one catalog operation and decodes its JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the request fails, the catalog reports
    /// a non-success status, or the response cannot be decoded.
    pub fn post<B, R>(&self, operation: &str, body: &B) -> Result<R, CatalogError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = self
            .config
            .base_url
            .join(operation)
            .map_err(|error| CatalogError::Transport(error.to_string()))?;

        debug!(%url, operation, "catalog call");

        let mut response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|error| CatalogError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Remote(format!(
                "{operation} returned status {status}"
            )));
        }

        let bytes = read_response_limited(&mut response, self.config.max_response_bytes)?;
        serde_json::from_slice(&bytes).map_err(|error| {
            CatalogError::Protocol(format!("{operation} response decode failed: {error}"))
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, CatalogError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| CatalogError::Transport("response size limit exceeds u64".to_string()))?;

    if let Some(expected) = expected_len {
        if expected > max_bytes_u64 {
            return Err(CatalogError::Transport(
                "catalog response exceeds size limit".to_string(),
            ));
        }
    }

    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|error| CatalogError::Transport(error.to_string()))?;

    if buf.len() > max_bytes {
        return Err(CatalogError::Transport(
            "catalog response exceeds size limit".to_string(),
        ));
    }

    Ok(buf)
}
