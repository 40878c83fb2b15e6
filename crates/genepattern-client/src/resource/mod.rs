// crates/genepattern-client/src/resource/mod.rs
// ============================================================================
// Module: Remote Resources
// Description: URI-addressed handles for server-side files, jobs, and tasks.
// Purpose: Share one addressing contract across resource handles.
// Dependencies: crate::connection
// ============================================================================

//! ## Overview
//! Every server object the client touches is addressed by a URI and bound to
//! the [`crate::Connection`] that created it. Handles are cheap to clone and
//! hold no server state beyond what each type documents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::connection::Connection;

// ============================================================================
// SECTION: Resource Trait
// ============================================================================

/// A handle to a URI-addressed server object.
pub trait Resource {
    /// Absolute URI of the object.
    fn uri(&self) -> String;

    /// Connection the handle issues requests through.
    fn connection(&self) -> &Connection;
}

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod file;
pub mod job;
pub mod task;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use file::RemoteFile;
pub use job::Job;
pub use job::JobPhase;
pub use task::Choice;
pub use task::ChoiceStatus;
pub use task::ParamAttributes;
pub use task::ParamDescriptor;
pub use task::ParamKind;
pub use task::TaskDescriptor;
