// crates/genepattern-config/src/config.rs
// ============================================================================
// Module: GenePattern Configuration
// Description: Configuration loading and validation for the GenePattern client.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file names the remote server and its credentials, the client identity
//! sent on every request, the poll backoff cadence, and where the local
//! module identifier authority keeps its record.
//! Missing or invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "genepattern.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "GENEPATTERN_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 256 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = "GenePatternRest";
/// Default tag attached to submitted jobs.
pub const DEFAULT_JOB_TAG: &str = "GenePattern Python Client";
/// Default prefix for the OAuth client identifier.
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "GenePatternNotebook-";
/// Default poll unit in milliseconds.
pub const DEFAULT_POLL_UNIT_MS: u64 = 1_000;
/// Default backoff cap (in units) for a single job wait.
pub const DEFAULT_JOB_CAP: u32 = 60;
/// Default backoff cap (in units) for a batch wait.
pub const DEFAULT_BATCH_CAP: u32 = 10;
/// Default LSID namespace for locally authored modules.
pub const DEFAULT_MODULE_NAMESPACE: &str = "genepatternmodules";

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level GenePattern client configuration.
///
/// # Invariants
/// - `server.url` is an absolute `http`/`https` URL.
/// - Poll caps are at least one unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenePatternConfig {
    /// Remote server location and credentials.
    pub server: ServerConfig,
    /// Client identity sent with requests.
    #[serde(default)]
    pub client: ClientConfig,
    /// Poll cadence for job completion waits.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Local module authoring settings.
    #[serde(default)]
    pub modules: ModulesConfig,
}

impl GenePatternConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then `GENEPATTERN_CONFIG`, then
    /// `genepattern.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.client.validate()?;
        self.polling.validate()?;
        self.modules.validate()?;
        Ok(())
    }
}

/// Remote server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the server, for example `https://cloud.genepattern.org/gp`.
    pub url: String,
    /// Account name used for Basic auth and token login.
    pub username: String,
    /// Account password; empty when the server accepts none.
    #[serde(default)]
    pub password: String,
}

impl ServerConfig {
    /// Returns the base URL without any trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Validates server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("server.url must be set".to_string()));
        }
        let parsed = Url::parse(trimmed)
            .map_err(|err| ConfigError::Invalid(format!("server.url is not a valid url: {err}")))?;
        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::Invalid(format!(
                    "server.url scheme must be http or https, got {scheme}"
                )));
            }
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("server.username must be set".to_string()));
        }
        Ok(())
    }
}

/// Client identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Value for the `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Tag attached to each submitted job.
    #[serde(default = "default_job_tag")]
    pub job_tag: String,
    /// Prefix combined with the username to form the OAuth client id.
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,
    /// Optional per-request timeout; absent leaves the transport default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            job_tag: default_job_tag(),
            client_id_prefix: default_client_id_prefix(),
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Returns the configured request timeout, if any.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Validates client identity settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("client.user_agent must not be empty".to_string()));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "client.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Poll backoff configuration.
///
/// # Invariants
/// - `unit_ms` is non-zero.
/// - Both caps are at least one unit.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollingConfig {
    /// Length of one backoff unit in milliseconds.
    #[serde(default = "default_poll_unit_ms")]
    pub unit_ms: u64,
    /// Backoff cap in units when waiting on a single job.
    #[serde(default = "default_job_cap")]
    pub job_cap: u32,
    /// Backoff cap in units when waiting on a batch of jobs.
    #[serde(default = "default_batch_cap")]
    pub batch_cap: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            unit_ms: DEFAULT_POLL_UNIT_MS,
            job_cap: DEFAULT_JOB_CAP,
            batch_cap: DEFAULT_BATCH_CAP,
        }
    }
}

impl PollingConfig {
    /// Returns the backoff unit as a duration.
    #[must_use]
    pub const fn unit(&self) -> Duration {
        Duration::from_millis(self.unit_ms)
    }

    /// Validates polling settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_ms == 0 {
            return Err(ConfigError::Invalid("polling.unit_ms must be greater than zero".to_string()));
        }
        if self.job_cap < 1 {
            return Err(ConfigError::Invalid("polling.job_cap must be at least 1".to_string()));
        }
        if self.batch_cap < 1 {
            return Err(ConfigError::Invalid("polling.batch_cap must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Local module authoring configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModulesConfig {
    /// Location of the identifier authority record; defaults per user.
    #[serde(default)]
    pub authority_path: Option<PathBuf>,
    /// LSID authority domain; defaults to the host name.
    #[serde(default)]
    pub domain: Option<String>,
    /// LSID namespace for issued module identifiers.
    #[serde(default = "default_module_namespace")]
    pub namespace: String,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            authority_path: None,
            domain: None,
            namespace: default_module_namespace(),
        }
    }
}

impl ModulesConfig {
    /// Validates module authoring settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(ConfigError::Invalid(
                "modules.namespace must be non-empty and contain no ':'".to_string(),
            ));
        }
        if let Some(domain) = &self.domain
            && (domain.is_empty() || domain.contains(':'))
        {
            return Err(ConfigError::Invalid(
                "modules.domain must be non-empty and contain no ':'".to_string(),
            ));
        }
        if let Some(path) = &self.authority_path {
            validate_path(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Default `User-Agent` value.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Default job tag.
fn default_job_tag() -> String {
    DEFAULT_JOB_TAG.to_string()
}

/// Default OAuth client id prefix.
fn default_client_id_prefix() -> String {
    DEFAULT_CLIENT_ID_PREFIX.to_string()
}

/// Default poll unit in milliseconds.
const fn default_poll_unit_ms() -> u64 {
    DEFAULT_POLL_UNIT_MS
}

/// Default single-job backoff cap.
const fn default_job_cap() -> u32 {
    DEFAULT_JOB_CAP
}

/// Default batch backoff cap.
const fn default_batch_cap() -> u32 {
    DEFAULT_BATCH_CAP
}

/// Default module namespace.
fn default_module_namespace() -> String {
    DEFAULT_MODULE_NAMESPACE.to_string()
}
