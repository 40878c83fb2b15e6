// crates/genepattern-modules/src/manifest.rs
// ============================================================================
// Module: Manifest Rendering
// Description: Flat key=value manifest text for a module descriptor.
// Purpose: Emit manifest lines in the order the server's installer expects.
// Dependencies: time
// ============================================================================

//! ## Overview
//! A manifest is three comment lines followed by module keys, one `pN_`
//! block per parameter, and the trailing module keys. Colons and equals
//! signs inside escaped values are written as `\:` and `\=`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::macros::format_description;

use crate::descriptor::ModuleDescriptor;
use crate::error::ModuleError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of a module manifest.
pub const MANIFEST_FILE_NAME: &str = "manifest";

/// Generator line written into manifest headers.
const GENERATOR: &str = concat!("Generated by genepattern-modules v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Character Rules
// ============================================================================

/// Escapes `:` and `=` for manifest values.
#[must_use]
pub fn manifest_escape(value: &str) -> String {
    value.replace(':', "\\:").replace('=', "\\=")
}

/// Returns true for characters forbidden in module and parameter names.
///
/// Forbidden: ASCII punctuation other than `_` and `.`, and ASCII whitespace
/// including vertical tab.
#[must_use]
pub const fn is_invalid_name_char(ch: char) -> bool {
    (ch.is_ascii_punctuation() && ch != '_' && ch != '.') || ch.is_ascii_whitespace() || ch == '\x0b'
}

/// Returns true when `name` contains a forbidden character.
#[must_use]
pub fn has_invalid_name_chars(name: &str) -> bool {
    name.chars().any(is_invalid_name_char)
}

/// Checks the `urn:lsid:<domain>:<namespace>:<number>[:<version>]` shape.
///
/// # Errors
///
/// Returns [`ModuleError::Validation`] for a wrong colon count or prefix.
pub fn validate_lsid_shape(lsid: &str) -> Result<(), ModuleError> {
    let colons = lsid.matches(':').count();
    if colons != 4 && colons != 5 {
        return Err(ModuleError::Validation(format!(
            "lsid contains incorrect number of colons, 4 or 5 expected: {lsid}"
        )));
    }
    let scheme = lsid.split(':').next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("urn") {
        return Err(ModuleError::Validation(format!("lsid does not begin with urn: {lsid}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the manifest text for `descriptor` as of `generated_at`.
///
/// # Errors
///
/// Returns [`ModuleError::Validation`] when the descriptor is invalid.
pub fn render_manifest(descriptor: &ModuleDescriptor, generated_at: OffsetDateTime) -> Result<String, ModuleError> {
    descriptor.validate()?;
    let stamp = generated_at
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .map_err(|err| ModuleError::Validation(err.to_string()))?;
    let published = generated_at
        .format(format_description!("[month]/[day]/[year] [hour]:[minute]"))
        .map_err(|err| ModuleError::Validation(err.to_string()))?;
    let name = descriptor.name.as_deref().unwrap_or_default();

    let mut manifest = format!("# {name}\n# {stamp}\n# {GENERATOR}\n");
    push_property(&mut manifest, "JVMLevel", "");
    push_property(&mut manifest, "LSID", &manifest_escape(&descriptor.versioned_lsid()));
    push_property(&mut manifest, "author", &descriptor.author_line());
    push_property(&mut manifest, "categories", &descriptor.categories.join(";"));
    push_property(&mut manifest, "commandLine", descriptor.command_line.as_deref().unwrap_or_default());
    push_property(&mut manifest, "cpuType", descriptor.cpu.manifest_value());
    push_property(&mut manifest, "description", &descriptor.description);
    push_property(&mut manifest, "fileFormat", &descriptor.file_format.join(";"));
    push_property(&mut manifest, "language", &descriptor.language);
    push_property(&mut manifest, "license", &descriptor.license);
    push_property(&mut manifest, "name", name);
    push_property(&mut manifest, "os", descriptor.os.manifest_value());
    for (index, param) in descriptor.parameters.iter().enumerate() {
        manifest.push_str(&param.manifest_block(index + 1));
    }
    push_property(&mut manifest, "privacy", descriptor.privacy.manifest_value());
    push_property(&mut manifest, "publicationDate", &manifest_escape(&published));
    push_property(&mut manifest, "quality", descriptor.quality.manifest_value());
    push_property(&mut manifest, "taskDoc", &descriptor.documentation);
    push_property(&mut manifest, "taskType", descriptor.categories.first().map_or("", String::as_str));
    push_property(&mut manifest, "userid", descriptor.user.as_deref().unwrap_or_default());
    push_property(&mut manifest, "version", &descriptor.version_comment);
    Ok(manifest)
}

/// Appends one `key=value` line.
pub(crate) fn push_property(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    out.push_str(value);
    out.push('\n');
}

// ============================================================================
// SECTION: Tests
// ============================================================================
