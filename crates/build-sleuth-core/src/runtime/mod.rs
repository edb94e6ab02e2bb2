// build-sleuth-core/src/runtime/mod.rs
// ============================================================================
// Module: Resolver Runtime
// Description: The resolution engine and its supporting pieces.
// Purpose: Expose the resolver, gate, selector, tracker, and result types.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime turns analyzer checksums into the output map: the gate filters
//! input, the selector breaks ties, the not-found tracker maintains bucket
//! zero, and the resolver orchestrates catalogs, caches, and worker threads.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod gate;
pub mod memory;
pub mod not_found;
pub mod resolver;
pub mod result;
pub mod selector;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gate::ChecksumGate;
pub use memory::InMemoryResolverCache;
pub use not_found::add_without_build;
pub use not_found::promote;
pub use not_found::resolve_parent;
pub use resolver::AnalysisContext;
pub use resolver::BuildResolver;
pub use resolver::ChecksumTable;
pub use resolver::ResolveError;
pub use resolver::ResolverConfig;
pub use result::BUILDS_FILENAME;
pub use result::FinderResult;
pub use result::builds_from_json;
pub use result::builds_to_json;
pub use selector::mark_duplicate_archives;
pub use selector::select_best_build;
pub use selector::select_best_pnc_artifact;
