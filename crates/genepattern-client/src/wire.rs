// crates/genepattern-client/src/wire.rs
// ============================================================================
// Module: Wire Encoding
// Description: Explicit JSON encoding for values sent to the job endpoint.
// Purpose: Encode file handles as URLs and job specs as request bodies.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`WireEncode`] is implemented by the few client types that travel inside a
//! job submission. A [`crate::RemoteFile`] encodes to its URL string; a
//! [`crate::JobSpec`] encodes to `{lsid, params, tags}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Wire Trait
// ============================================================================

/// Encodes a value into the server's JSON wire format.
pub trait WireEncode {
    /// Returns the JSON representation sent to the server.
    fn to_wire(&self) -> Value;
}

impl WireEncode for str {
    fn to_wire(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl WireEncode for String {
    fn to_wire(&self) -> Value {
        self.as_str().to_wire()
    }
}

impl<T: WireEncode> WireEncode for [T] {
    fn to_wire(&self) -> Value {
        Value::Array(self.iter().map(WireEncode::to_wire).collect())
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    fn to_wire(&self) -> Value {
        self.as_slice().to_wire()
    }
}
