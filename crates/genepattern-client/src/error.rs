// crates/genepattern-client/src/error.rs
// ============================================================================
// Module: Client Errors
// Description: Error taxonomy for GenePattern REST calls.
// Purpose: Keep transport failures, auth failures, and misuse distinct.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every fallible client call returns [`ClientError`]. Transport and JSON
//! failures are flattened into strings so `reqwest` types stay private.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors emitted by the GenePattern client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or HTTP transport failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Server answered with an unexpected status.
    #[error("unexpected http status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
    },
    /// Token login was rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Choice accessor used on a parameter without choice metadata.
    #[error("not a choice parameter: {0}")]
    NotAChoiceParam(String),
    /// Response body was not the expected JSON shape.
    #[error("invalid server response: {0}")]
    Decode(String),
    /// Local file I/O failed.
    #[error("io failure: {0}")]
    Io(String),
    /// Shared client state was unusable.
    #[error("client state error: {0}")]
    State(String),
}

impl ClientError {
    /// Builds a decode error for a missing or mistyped field.
    pub(crate) fn missing(field: &str) -> Self {
        Self::Decode(format!("missing or invalid field: {field}"))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
