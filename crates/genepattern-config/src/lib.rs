// crates/genepattern-config/src/lib.rs
// ============================================================================
// Module: GenePattern Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for genepattern.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `genepattern-config` defines the configuration model shared by the
//! GenePattern client front-ends. It provides strict, fail-closed validation
//! with defaults that match the server's expected client identity.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
