// build-sleuth-catalog/src/lib.rs
// ============================================================================
// Module: Build Sleuth Catalog Library
// Description: Remote build-system clients behind the catalog interfaces.
// Purpose: Provide bounded blocking clients for Koji and PNC.
// Dependencies: build-sleuth-core, reqwest, url
// ============================================================================

//! ## Overview
//! Catalog clients translate the resolver's batched contract into HTTP calls
//! against the two build systems. Transport behavior is deliberately strict:
//! HTTPS by default, no redirects, bounded responses, and parity validation
//! on every batched reply.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;
pub mod koji;
pub mod pnc;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::GatewayConfig;
pub use http::JsonGateway;
pub use koji::KojiHubCatalog;
pub use koji::KojiHubConfig;
pub use pnc::PncRestCatalog;
pub use pnc::PncRestConfig;
