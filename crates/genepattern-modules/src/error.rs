// crates/genepattern-modules/src/error.rs
// ============================================================================
// Module: Module Errors
// Description: Error taxonomy for module descriptors and the LSID authority.
// Purpose: Report the first violation found while building a module.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Validation stops at the first violation; there is no aggregation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors emitted while describing, packaging, or registering modules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// A descriptor or parameter field is unset or malformed.
    #[error("invalid module descriptor: {0}")]
    Validation(String),
    /// A manifest file already exists where one would be written.
    #[error("existing manifest blocks manifest file creation: {0}")]
    ManifestCollision(String),
    /// An LSID was refused by the authority.
    #[error("invalid lsid: {0}")]
    InvalidIdentifier(String),
    /// Local file or archive I/O failed.
    #[error("module io error: {0}")]
    Io(String),
    /// The authority record could not be decoded or encoded.
    #[error("authority record error: {0}")]
    Record(String),
}

impl ModuleError {
    /// Builds an I/O error that names the path involved.
    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io(format!("{}: {err}", path.display()))
    }
}
