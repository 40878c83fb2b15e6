// crates/genepattern-modules/src/descriptor.rs
// ============================================================================
// Module: Module Descriptor
// Description: Description of a module to be packaged for a GenePattern server.
// Purpose: Validate module fields, write manifests, and build upload zips.
// Dependencies: time, tracing, crate::{archive, authority, manifest, param}
// ============================================================================

//! ## Overview
//! A [`ModuleDescriptor`] mirrors the manifest keys. `name`, `lsid`,
//! `command_line`, and `user` start unset and must be filled before
//! [`ModuleDescriptor::validate`] passes.
//! Invariants:
//! - Writing a manifest always re-validates first.
//! - [`ModuleDescriptor::create_zip`] never overwrites an existing manifest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use time::OffsetDateTime;
use tracing::info;
use tracing::warn;

use crate::archive::write_archive;
use crate::authority::IdentifierAuthority;
use crate::error::ModuleError;
use crate::manifest::MANIFEST_FILE_NAME;
use crate::manifest::has_invalid_name_chars;
use crate::manifest::render_manifest;
use crate::manifest::validate_lsid_shape;
use crate::param::ParamSpec;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Generates a manifest enum with fixed wire values.
macro_rules! manifest_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Value written to the manifest.
            #[must_use]
            pub const fn manifest_value(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }
        }
    };
}

manifest_enum!(
    /// Module visibility on the server.
    Privacy {
        /// Visible to the owner only.
        #[default]
        Private => "private",
        /// Visible to everyone.
        Public => "public",
    }
);

manifest_enum!(
    /// Release quality level.
    Quality {
        /// Under development.
        #[default]
        Development => "development",
        /// Release candidate.
        Preproduction => "preproduction",
        /// Released.
        Production => "production",
    }
);

manifest_enum!(
    /// Operating system requirement.
    OperatingSystem {
        /// No requirement.
        #[default]
        Any => "any",
        /// Linux only.
        Linux => "linux",
        /// macOS only.
        Mac => "mac",
        /// Windows only.
        Windows => "windows",
    }
);

manifest_enum!(
    /// CPU requirement.
    Cpu {
        /// No requirement.
        #[default]
        Any => "any",
        /// DEC Alpha.
        Alpha => "alpha",
        /// Intel x86.
        Intel => "intel",
        /// `PowerPC`.
        PowerPc => "powerpc",
        /// SPARC.
        Sparc => "sparc",
    }
);

// ============================================================================
// SECTION: Zip Options
// ============================================================================

/// Options for [`ModuleDescriptor::create_zip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipOptions {
    /// Delete the manifest after zipping.
    pub clean: bool,
    /// Bump the version counter before packaging.
    pub increment_version: bool,
}

impl Default for ZipOptions {
    fn default() -> Self {
        Self {
            clean: true,
            increment_version: false,
        }
    }
}

// ============================================================================
// SECTION: Module Descriptor
// ============================================================================

/// Description of a module to package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Module name.
    pub name: Option<String>,
    /// Short description.
    pub description: String,
    /// Free-text note for this version.
    pub version_comment: String,
    /// Author name.
    pub author: String,
    /// Author institution.
    pub institution: String,
    /// Categories; the first one is the task type.
    pub categories: Vec<String>,
    /// Visibility.
    pub privacy: Privacy,
    /// Release quality.
    pub quality: Quality,
    /// Output file formats.
    pub file_format: Vec<String>,
    /// Operating system requirement.
    pub os: OperatingSystem,
    /// CPU requirement.
    pub cpu: Cpu,
    /// Implementation language.
    pub language: String,
    /// Owning user id.
    pub user: Option<String>,
    /// Files zipped next to the manifest.
    pub support_files: Vec<PathBuf>,
    /// Documentation file or URL.
    pub documentation: String,
    /// License file.
    pub license: String,
    /// Module LSID, with or without a version suffix.
    pub lsid: Option<String>,
    /// Version counter appended to an unversioned LSID when non-zero.
    pub version: u32,
    /// Command line template.
    pub command_line: Option<String>,
    /// Parameters in manifest order.
    pub parameters: Vec<ParamSpec>,
}

impl Default for ModuleDescriptor {
    fn default() -> Self {
        Self {
            name: None,
            description: String::new(),
            version_comment: String::new(),
            author: String::new(),
            institution: String::new(),
            categories: Vec::new(),
            privacy: Privacy::default(),
            quality: Quality::default(),
            file_format: Vec::new(),
            os: OperatingSystem::default(),
            cpu: Cpu::default(),
            language: "Python".to_string(),
            user: None,
            support_files: Vec::new(),
            documentation: String::new(),
            license: String::new(),
            lsid: None,
            version: 0,
            command_line: None,
            parameters: Vec::new(),
        }
    }
}

impl ModuleDescriptor {
    /// Checks required fields, naming rules, LSID shape, and every parameter.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModuleError::Validation`] found.
    pub fn validate(&self) -> Result<(), ModuleError> {
        let name = required("name", self.name.as_deref())?;
        let user = required("user", self.user.as_deref())?;
        let lsid = required("lsid", self.lsid.as_deref())?;
        required("command_line", self.command_line.as_deref())?;
        if name.is_empty() {
            return Err(ModuleError::Validation("name is not set".to_string()));
        }
        if user.is_empty() {
            return Err(ModuleError::Validation("user is not set".to_string()));
        }
        if has_invalid_name_chars(name) {
            return Err(ModuleError::Validation(format!("module name includes invalid characters: {name}")));
        }
        validate_lsid_shape(lsid)?;
        for param in &self.parameters {
            param.validate()?;
        }
        Ok(())
    }

    /// `author;institution`, or whichever of the two is set.
    #[must_use]
    pub fn author_line(&self) -> String {
        match (self.author.is_empty(), self.institution.is_empty()) {
            (false, false) => format!("{};{}", self.author, self.institution),
            (false, true) => self.author.clone(),
            _ => self.institution.clone(),
        }
    }

    /// LSID with the version counter appended when it is not already versioned.
    #[must_use]
    pub fn versioned_lsid(&self) -> String {
        let lsid = self.lsid.as_deref().unwrap_or_default();
        if self.version == 0 || lsid.matches(':').count() >= 5 {
            lsid.to_string()
        } else {
            format!("{lsid}:{}", self.version)
        }
    }

    /// Writes `manifest` into `directory`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] when validation or the write fails.
    pub fn write_manifest(&self, directory: &Path) -> Result<PathBuf, ModuleError> {
        self.write_manifest_at(directory, OffsetDateTime::now_utc())
    }

    /// Writes `manifest` into `directory`, stamped with `generated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] when validation or the write fails.
    pub fn write_manifest_at(&self, directory: &Path, generated_at: OffsetDateTime) -> Result<PathBuf, ModuleError> {
        let text = render_manifest(self, generated_at)?;
        let path = directory.join(MANIFEST_FILE_NAME);
        fs::write(&path, text).map_err(|err| ModuleError::io(&path, err))?;
        Ok(path)
    }

    /// Packages the manifest and support files into `<name>.zip` in `directory`.
    ///
    /// With an authority, the (possibly versioned) LSID is checked before any
    /// file is written and registered once the zip exists.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::ManifestCollision`] when `directory` already
    /// holds a manifest, [`ModuleError::InvalidIdentifier`] when the authority
    /// refuses the LSID, and other [`ModuleError`] variants for validation or
    /// I/O failures.
    pub fn create_zip(
        &mut self,
        directory: &Path,
        options: ZipOptions,
        authority: Option<&mut IdentifierAuthority>,
    ) -> Result<PathBuf, ModuleError> {
        self.validate()?;
        let manifest_path = directory.join(MANIFEST_FILE_NAME);
        if manifest_path.exists() {
            return Err(ModuleError::ManifestCollision(manifest_path.display().to_string()));
        }
        let mut candidate = self.clone();
        if options.increment_version {
            candidate.version = candidate.version.saturating_add(1);
        }
        let lsid = candidate.versioned_lsid();
        if let Some(authority) = authority.as_deref() {
            authority.check_registrable(&lsid)?;
        }

        candidate.write_manifest(directory)?;
        let name = candidate.name.as_deref().unwrap_or_default();
        let zip_path = directory.join(format!("{name}.zip"));
        let archived = write_archive(&zip_path, &manifest_path, &candidate.support_files);
        if archived.is_err() {
            discard_partial_archive(&zip_path);
        }
        if options.clean {
            fs::remove_file(&manifest_path).map_err(|err| ModuleError::io(&manifest_path, err))?;
        }
        archived?;

        if let Some(authority) = authority {
            authority.register(&lsid, name)?;
        }
        info!(module = name, lsid = %lsid, zip = %zip_path.display(), "module packaged");
        *self = candidate;
        Ok(zip_path)
    }
}

/// Removes an archive left behind by a failed write.
fn discard_partial_archive(zip_path: &Path) {
    if let Err(err) = fs::remove_file(zip_path)
        && err.kind() != ErrorKind::NotFound
    {
        warn!(zip = %zip_path.display(), error = %err, "could not remove partial archive");
    }
}

/// Returns the value of a required field or a "not set" violation.
fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ModuleError> {
    value.ok_or_else(|| ModuleError::Validation(format!("{field} is not set")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
