// crates/genepattern-client/src/lib.rs
// ============================================================================
// Module: GenePattern Client Library
// Description: Blocking REST client for a GenePattern server.
// Purpose: Discover tasks, submit jobs, poll them, and fetch their outputs.
// Dependencies: base64, genepattern-config, genepattern-formats, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! A [`Connection`] authenticates against the server and hands out resource
//! handles: [`TaskDescriptor`] for task metadata, [`Job`] for submitted jobs,
//! and [`RemoteFile`] for inputs and outputs. Every call blocks the calling
//! thread; job waits sleep between polls using [`PollPolicy`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backoff;
pub mod connection;
pub mod error;
pub mod resource;
pub mod spec;
pub mod wire;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backoff::PollPolicy;
pub use backoff::next_wait_units;
pub use connection::ClientIdentity;
pub use connection::Connection;
pub use connection::ConnectionBuilder;
pub use error::ClientError;
pub use resource::Choice;
pub use resource::ChoiceStatus;
pub use resource::Job;
pub use resource::JobPhase;
pub use resource::ParamAttributes;
pub use resource::ParamDescriptor;
pub use resource::ParamKind;
pub use resource::RemoteFile;
pub use resource::Resource;
pub use resource::TaskDescriptor;
pub use spec::JobSpec;
pub use spec::ParamEntry;
pub use spec::ParamValue;
pub use wire::WireEncode;
