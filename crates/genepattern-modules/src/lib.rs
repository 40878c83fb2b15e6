// crates/genepattern-modules/src/lib.rs
// ============================================================================
// Module: GenePattern Modules Library
// Description: Module descriptors, manifests, zip bundles, and LSID allocation.
// Purpose: Package local tools as installable GenePattern modules.
// Dependencies: genepattern-config, serde_json, time, tracing, zip
// ============================================================================

//! ## Overview
//! Fill a [`ModuleDescriptor`] with [`ParamSpec`] entries, validate it, and
//! call [`ModuleDescriptor::create_zip`] to produce the upload bundle. An
//! [`IdentifierAuthority`] issues and records module LSIDs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod archive;
pub mod authority;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod param;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use authority::IdentifierAuthority;
pub use descriptor::Cpu;
pub use descriptor::ModuleDescriptor;
pub use descriptor::OperatingSystem;
pub use descriptor::Privacy;
pub use descriptor::Quality;
pub use descriptor::ZipOptions;
pub use error::ModuleError;
pub use manifest::MANIFEST_FILE_NAME;
pub use manifest::manifest_escape;
pub use manifest::render_manifest;
pub use param::ParamChoice;
pub use param::ParamSpec;
pub use param::ParamType;
