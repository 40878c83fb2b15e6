// crates/genepattern-formats/src/error.rs
// ============================================================================
// Module: Format Errors
// Description: Error taxonomy for tabular source resolution and parsing.
// Purpose: Give codec callers stable, string-carrying failure variants.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every codec entry point fails with [`FormatError`]. Variants carry
//! human-readable detail so transport and CSV error types stay private.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tabular format errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The input could not be classified as stream, text, URL, or path.
    #[error("unsupported table source: {0}")]
    UnsupportedSource(String),
    /// The input was classified but could not be opened or read.
    #[error("table source unreadable: {0}")]
    SourceUnreadable(String),
    /// Header or body shape violation.
    #[error("malformed {format} file: {reason}")]
    Malformed {
        /// Format being parsed (`GCT` or `ODF`).
        format: &'static str,
        /// Underlying cause.
        reason: String,
    },
}

impl FormatError {
    /// Builds a GCT shape violation.
    pub(crate) fn gct(reason: impl Into<String>) -> Self {
        Self::Malformed {
            format: "GCT",
            reason: reason.into(),
        }
    }

    /// Builds an ODF shape violation.
    pub(crate) fn odf(reason: impl Into<String>) -> Self {
        Self::Malformed {
            format: "ODF",
            reason: reason.into(),
        }
    }
}
