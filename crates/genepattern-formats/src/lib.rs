// crates/genepattern-formats/src/lib.rs
// ============================================================================
// Module: GenePattern Formats Library
// Description: GCT and ODF tabular codecs with shared source resolution.
// Purpose: Read and write the server ecosystem's flat tabular files.
// Dependencies: csv, reqwest, thiserror, tracing, url
// ============================================================================

//! ## Overview
//! `genepattern-formats` parses the two flat tabular formats produced by
//! GenePattern modules: the GCT expression matrix and the ODF annotated
//! table. Both codecs read from a [`TableSource`] (an open stream, inline
//! text, a URL, or a local path) and write back to text.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod gct;
pub mod odf;
pub mod source;
pub mod table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::FormatError;
pub use gct::Gct;
pub use gct::RowKey;
pub use odf::HeaderEntry;
pub use odf::HeaderSeparator;
pub use odf::Odf;
pub use source::TableSource;
pub use source::is_url;
pub use table::Table;
pub use table::TableShapeError;
