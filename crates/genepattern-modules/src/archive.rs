// crates/genepattern-modules/src/archive.rs
// ============================================================================
// Module: Module Archive
// Description: Zip writer for module manifests and support files.
// Purpose: Produce the upload bundle a GenePattern server installs from.
// Dependencies: zip
// ============================================================================

//! ## Overview
//! The archive holds `manifest` first, then each support file stored under
//! its file name, all deflated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::error::ModuleError;
use crate::manifest::MANIFEST_FILE_NAME;

// ============================================================================
// SECTION: Archive Writer
// ============================================================================

/// Writes `zip_path` containing the manifest and every support file.
///
/// # Errors
///
/// Returns [`ModuleError::Io`] when a file cannot be read or the archive
/// cannot be written.
pub fn write_archive(zip_path: &Path, manifest_path: &Path, support_files: &[PathBuf]) -> Result<(), ModuleError> {
    let file = File::create(zip_path).map_err(|err| ModuleError::io(zip_path, err))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    add_entry(&mut writer, options, MANIFEST_FILE_NAME, manifest_path, zip_path)?;
    for support in support_files {
        let entry = support
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ModuleError::Io(format!("support file has no name: {}", support.display())))?;
        add_entry(&mut writer, options, entry, support, zip_path)?;
    }
    writer.finish().map_err(|err| ModuleError::io(zip_path, err))?;
    Ok(())
}

/// Copies one file into the archive under `entry`.
fn add_entry(
    writer: &mut ZipWriter<File>,
    options: FileOptions,
    entry: &str,
    source: &Path,
    zip_path: &Path,
) -> Result<(), ModuleError> {
    let data = fs::read(source).map_err(|err| ModuleError::io(source, err))?;
    writer.start_file(entry, options).map_err(|err| ModuleError::io(zip_path, err))?;
    writer.write_all(&data).map_err(|err| ModuleError::io(zip_path, err))?;
    Ok(())
}
