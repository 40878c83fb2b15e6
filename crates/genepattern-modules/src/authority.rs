// crates/genepattern-modules/src/authority.rs
// ============================================================================
// Module: LSID Authority
// Description: Local allocator for namespaced module identifiers.
// Purpose: Issue `urn:lsid` identifiers and remember which were registered.
// Dependencies: genepattern-config, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! The authority persists `{base_lsid, module_count, registered_modules}` as
//! JSON. New identifiers are `<base_lsid>:<count + 1>`, zero-padded to five
//! digits. Saves go through a temporary file and a rename.
//! Invariants:
//! - `module_count` only increases.
//! - A registered identifier starts with `base_lsid` and was not registered before.
//!
//! Concurrent registration from two processes against one record is not
//! coordinated; the last writer wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use genepattern_config::DEFAULT_MODULE_NAMESPACE;
use genepattern_config::ModulesConfig;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::error::ModuleError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the persisted authority record.
pub const AUTHORITY_FILE_NAME: &str = "lsid_authority.json";

/// Domain used when no host name is known.
const FALLBACK_DOMAIN: &str = "localhost";

// ============================================================================
// SECTION: Record
// ============================================================================

/// Persisted authority state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AuthorityRecord {
    /// `urn:lsid:<domain>:<namespace>` prefix of every identifier.
    base_lsid: String,
    /// Number of registrations so far.
    module_count: u64,
    /// Registered identifier to module name.
    registered_modules: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Local LSID authority bound to a record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAuthority {
    /// Record location.
    path: PathBuf,
    /// Current state.
    record: AuthorityRecord,
}

impl IdentifierAuthority {
    /// Creates an empty authority for `base_lsid`; nothing is written until
    /// the first registration or [`IdentifierAuthority::save`].
    #[must_use]
    pub fn with_base(path: &Path, base_lsid: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            record: AuthorityRecord {
                base_lsid: base_lsid.to_string(),
                module_count: 0,
                registered_modules: BTreeMap::new(),
            },
        }
    }

    /// Loads an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Io`] when the file cannot be read and
    /// [`ModuleError::Record`] when it is not a valid record.
    pub fn load(path: &Path) -> Result<Self, ModuleError> {
        let text = fs::read_to_string(path).map_err(|err| ModuleError::io(path, err))?;
        let record: AuthorityRecord =
            serde_json::from_str(&text).map_err(|err| ModuleError::Record(format!("{}: {err}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            record,
        })
    }

    /// Loads the record at `path`, or creates and saves a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] when loading or the initial save fails.
    pub fn open(path: &Path, domain: &str, namespace: &str) -> Result<Self, ModuleError> {
        if path.exists() {
            return Self::load(path);
        }
        let authority = Self::with_base(path, &base_lsid(domain, namespace));
        authority.save()?;
        info!(path = %path.display(), base = %authority.record.base_lsid, "created lsid authority");
        Ok(authority)
    }

    /// Opens the record in the per-user configuration directory.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::Io`] when no configuration directory is known
    /// or the record cannot be opened.
    pub fn open_default() -> Result<Self, ModuleError> {
        let path = default_record_path()?;
        Self::open(&path, &default_domain(), DEFAULT_MODULE_NAMESPACE)
    }

    /// Opens the record described by the `[modules]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] when the record cannot be opened.
    pub fn from_config(config: &ModulesConfig) -> Result<Self, ModuleError> {
        let path = match &config.authority_path {
            Some(path) => path.clone(),
            None => default_record_path()?,
        };
        let domain = config.domain.clone().unwrap_or_else(default_domain);
        Self::open(&path, &domain, &config.namespace)
    }

    /// Record location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier prefix.
    #[must_use]
    pub fn base_lsid(&self) -> &str {
        &self.record.base_lsid
    }

    /// Number of registrations so far.
    #[must_use]
    pub const fn module_count(&self) -> u64 {
        self.record.module_count
    }

    /// Registered identifiers and their module names.
    #[must_use]
    pub const fn registered(&self) -> &BTreeMap<String, String> {
        &self.record.registered_modules
    }

    /// Next identifier: base plus the zero-padded next count.
    #[must_use]
    pub fn lsid(&self) -> String {
        format!("{}:{:05}", self.record.base_lsid, self.record.module_count.saturating_add(1))
    }

    /// Returns true when `lsid` could be registered now.
    #[must_use]
    pub fn validate(&self, lsid: &str) -> bool {
        self.check_registrable(lsid).is_ok()
    }

    /// Explains why `lsid` cannot be registered.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::InvalidIdentifier`] for a foreign or reused LSID.
    pub fn check_registrable(&self, lsid: &str) -> Result<(), ModuleError> {
        let under_base = lsid
            .strip_prefix(self.record.base_lsid.as_str())
            .is_some_and(|rest| rest.starts_with(':'));
        if !under_base {
            return Err(ModuleError::InvalidIdentifier(format!(
                "{lsid} is not under {}",
                self.record.base_lsid
            )));
        }
        if self.record.registered_modules.contains_key(lsid) {
            return Err(ModuleError::InvalidIdentifier(format!("{lsid} is already registered")));
        }
        Ok(())
    }

    /// Records `lsid` for `module_name`, bumps the count, and saves.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::InvalidIdentifier`] for a refused LSID and
    /// [`ModuleError::Io`] when the save fails.
    pub fn register(&mut self, lsid: &str, module_name: &str) -> Result<(), ModuleError> {
        self.check_registrable(lsid)?;
        self.record.registered_modules.insert(lsid.to_string(), module_name.to_string());
        self.record.module_count = self.record.module_count.saturating_add(1);
        self.save()?;
        info!(lsid, module = module_name, count = self.record.module_count, "registered lsid");
        Ok(())
    }

    /// Writes the record through a temporary file and a rename.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError`] when encoding or any file operation fails.
    pub fn save(&self) -> Result<(), ModuleError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| ModuleError::io(parent, err))?;
        }
        let bytes = serde_json::to_vec_pretty(&self.record).map_err(|err| ModuleError::Record(err.to_string()))?;
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|err| ModuleError::io(&temp_path, err))?;
        file.write_all(&bytes).map_err(|err| ModuleError::io(&temp_path, err))?;
        file.sync_all().map_err(|err| ModuleError::io(&temp_path, err))?;
        fs::rename(&temp_path, &self.path).map_err(|err| ModuleError::io(&self.path, err))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Builds `urn:lsid:<domain>:<namespace>`.
#[must_use]
pub fn base_lsid(domain: &str, namespace: &str) -> String {
    format!("urn:lsid:{domain}:{namespace}")
}

/// Host name from `HOSTNAME`, or `localhost`.
#[must_use]
pub fn default_domain() -> String {
    env::var("HOSTNAME")
        .ok()
        .map(|host| host.trim().to_string())
        .filter(|host| !host.is_empty() && !host.contains(':'))
        .unwrap_or_else(|| FALLBACK_DOMAIN.to_string())
}

/// Record path under `$XDG_CONFIG_HOME/genepattern` or `$HOME/.genepattern`.
///
/// # Errors
///
/// Returns [`ModuleError::Io`] when neither variable is set.
pub fn default_record_path() -> Result<PathBuf, ModuleError> {
    if let Some(config_home) = env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(config_home).join("genepattern").join(AUTHORITY_FILE_NAME));
    }
    env::var_os("HOME")
        .filter(|value| !value.is_empty())
        .map(|home| PathBuf::from(home).join(".genepattern").join(AUTHORITY_FILE_NAME))
        .ok_or_else(|| ModuleError::Io("no configuration directory: set XDG_CONFIG_HOME or HOME".to_string()))
}
