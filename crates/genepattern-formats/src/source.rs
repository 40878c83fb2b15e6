// crates/genepattern-formats/src/source.rs
// ============================================================================
// Module: Table Sources
// Description: Input-source resolution shared by the GCT and ODF codecs.
// Purpose: Turn a stream, inline text, URL, or path into table text.
// Dependencies: reqwest, tracing, url
// ============================================================================

//! ## Overview
//! [`TableSource`] is the tagged union every codec reads from. String inputs
//! are classified in priority order: text containing a newline is inline
//! content, text shaped like a URL is fetched over HTTP, and anything else is
//! opened as a local path.
//! Invariants:
//! - Source bytes are capped at [`MAX_SOURCE_BYTES`].
//! - Only `http` and `https` URLs are fetched; `ftp`/`ftps` classify as URLs
//!   but fail as unsupported when read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use reqwest::blocking::Client;
use tracing::debug;
use url::Host;
use url::Url;

use crate::error::FormatError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of bytes read from any table source.
pub const MAX_SOURCE_BYTES: usize = 512 * 1024 * 1024;

/// URL schemes recognised by the source classifier.
const URL_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

// ============================================================================
// SECTION: Table Source
// ============================================================================

/// Input for a tabular codec.
pub enum TableSource {
    /// An already-open byte stream.
    Stream(Box<dyn Read>),
    /// Inline file content.
    RawText(String),
    /// A remote file fetched by HTTP GET.
    Url(Url),
    /// A local file path.
    Path(PathBuf),
}

impl fmt::Debug for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::RawText(text) => f.debug_tuple("RawText").field(&text.len()).finish(),
            Self::Url(url) => f.debug_tuple("Url").field(&url.as_str()).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

impl TableSource {
    /// Wraps an open reader.
    #[must_use]
    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// Classifies a string input.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnsupportedSource`] for an empty string.
    pub fn resolve(input: &str) -> Result<Self, FormatError> {
        if input.is_empty() {
            return Err(FormatError::UnsupportedSource("empty input string".to_string()));
        }
        if input.contains('\n') {
            return Ok(Self::RawText(input.to_string()));
        }
        if let Some(url) = parse_table_url(input) {
            return Ok(Self::Url(url));
        }
        Ok(Self::Path(PathBuf::from(input)))
    }

    /// Reads the full source as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the source cannot be opened, read, or
    /// decoded.
    pub fn read_text(self) -> Result<String, FormatError> {
        match self {
            Self::RawText(text) => Ok(text),
            Self::Stream(reader) => read_limited(reader, "stream"),
            Self::Path(path) => {
                let file = File::open(&path).map_err(|err| {
                    FormatError::SourceUnreadable(format!(
                        "input not raw data, URL, or readable file: {}: {err}",
                        path.display()
                    ))
                })?;
                read_limited(file, &path.display().to_string())
            }
            Self::Url(url) => fetch_url(&url),
        }
    }
}

impl From<String> for TableSource {
    fn from(text: String) -> Self {
        Self::RawText(text)
    }
}

impl From<PathBuf> for TableSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<File> for TableSource {
    fn from(file: File) -> Self {
        Self::from_reader(file)
    }
}

// ============================================================================
// SECTION: URL Classification
// ============================================================================

/// Returns true when the input is shaped like a fetchable table URL.
///
/// Accepts `http`, `https`, `ftp`, and `ftps` URLs whose host is a dotted
/// domain name, `localhost`, or an IPv4 literal, with an optional port and
/// path. Whitespace anywhere disqualifies the input.
#[must_use]
pub fn is_url(input: &str) -> bool {
    parse_table_url(input).is_some()
}

/// Parses a table URL, returning `None` when the input is not URL-shaped.
fn parse_table_url(input: &str) -> Option<Url> {
    if input.chars().any(char::is_whitespace) {
        return None;
    }
    let (scheme, rest) = input.split_once("://")?;
    if !URL_SCHEMES.iter().any(|known| scheme.eq_ignore_ascii_case(known)) {
        return None;
    }
    if rest.starts_with('[') {
        return None;
    }
    let url = Url::parse(input).ok()?;
    match url.host()? {
        Host::Ipv4(_) => Some(url),
        Host::Ipv6(_) => None,
        Host::Domain(domain) => is_table_host(domain).then_some(url),
    }
}

/// Returns true for `localhost` or a dotted domain with a plausible TLD.
fn is_table_host(domain: &str) -> bool {
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let trimmed = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = trimmed.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    rest.iter().all(|label| is_domain_label(label))
        && tld.len() >= 2
        && tld.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

/// Returns true for a 1-63 character label without edge hyphens.
fn is_domain_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Fetches a table URL with a blocking GET.
fn fetch_url(url: &Url) -> Result<String, FormatError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FormatError::UnsupportedSource(format!(
                "scheme {scheme} is not fetchable: {url}"
            )));
        }
    }
    debug!(url = %url, "fetching table source");
    let client =
        Client::builder().build().map_err(|err| FormatError::SourceUnreadable(err.to_string()))?;
    let response = client
        .get(url.as_str())
        .send()
        .map_err(|err| FormatError::SourceUnreadable(format!("{url}: {err}")))?;
    if !response.status().is_success() {
        return Err(FormatError::SourceUnreadable(format!(
            "{url}: http status {}",
            response.status()
        )));
    }
    read_limited(response, url.as_str())
}

/// Reads a stream to a string, enforcing the byte cap.
fn read_limited<R: Read>(reader: R, label: &str) -> Result<String, FormatError> {
    let limit = u64::try_from(MAX_SOURCE_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut limited = reader.take(limit);
    let mut bytes = Vec::new();
    limited
        .read_to_end(&mut bytes)
        .map_err(|err| FormatError::SourceUnreadable(format!("{label}: {err}")))?;
    if bytes.len() > MAX_SOURCE_BYTES {
        return Err(FormatError::SourceUnreadable(format!(
            "{label}: exceeds {MAX_SOURCE_BYTES} bytes"
        )));
    }
    String::from_utf8(bytes)
        .map_err(|_| FormatError::SourceUnreadable(format!("{label}: content is not utf-8")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
