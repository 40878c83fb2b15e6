// crates/genepattern-formats/src/odf.rs
// ============================================================================
// Module: ODF Codec
// Description: Reader and writer for the ODF annotated tabular format.
// Purpose: Parse key/value header blocks and headerless tab-delimited bodies.
// Dependencies: csv
// ============================================================================

//! ## Overview
//! An ODF file starts with a version line and a `HeaderLines=<n>` line,
//! followed by `n` header lines of `key=value` or `key:value`, then a
//! headerless tab-delimited body whose column names come from the
//! `COLUMN_NAMES` header when present.
//!
//! Blank (or pair-less) lines inside the declared header region do not count
//! as entries, and the header region is extended by that many lines. The body
//! therefore starts at line `2 + n + blanks`.
//!
//! Invariants:
//! - Header entries keep file order and their original separator.
//! - The body text after the header region is kept verbatim, so a write
//!   reproduces it byte for byte.
//! - Header counts that overflow are malformed, never a panic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::error::FormatError;
use crate::source::TableSource;
use crate::table::Table;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default version line for newly written ODF files.
pub const ODF_VERSION_LINE: &str = "ODF 1.0";
/// Header key declaring the header block length.
pub const HEADER_LINES_KEY: &str = "HeaderLines";
/// Header key holding tab-separated column names.
pub const COLUMN_NAMES_KEY: &str = "COLUMN_NAMES";
/// Header key holding tab-separated column types.
pub const COLUMN_TYPES_KEY: &str = "COLUMN_TYPES";
/// Header key naming the producing model.
pub const MODEL_KEY: &str = "Model";
/// Header key declaring the number of body rows.
pub const DATA_LINES_KEY: &str = "DataLines";

/// Keys written ahead of the sorted remainder, in order.
const LEADING_KEYS: [&str; 3] = [COLUMN_NAMES_KEY, COLUMN_TYPES_KEY, MODEL_KEY];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Separator used by a header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderSeparator {
    /// `key=value`
    #[default]
    Equals,
    /// `key:value`
    Colon,
}

impl HeaderSeparator {
    /// Returns the separator character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Equals => '=',
            Self::Colon => ':',
        }
    }
}

/// One header key/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    /// Trimmed key.
    pub key: String,
    /// Trimmed value.
    pub value: String,
    /// Separator the entry was read with.
    pub separator: HeaderSeparator,
}

/// A parsed ODF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Odf {
    /// First line of the file.
    version: String,
    /// Header entries in file order, excluding `HeaderLines`.
    headers: Vec<HeaderEntry>,
    /// Body rows.
    table: Table,
}

impl Odf {
    /// Builds an ODF document from headers and a body.
    ///
    /// A later entry with the same key replaces an earlier one.
    #[must_use]
    pub fn new(headers: Vec<HeaderEntry>, table: Table) -> Self {
        let mut odf = Self {
            version: ODF_VERSION_LINE.to_string(),
            headers: Vec::new(),
            table,
        };
        for entry in headers {
            odf.upsert(entry);
        }
        odf
    }

    /// Reads and parses an ODF file from any table source.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the source is unreadable or malformed.
    pub fn read(source: TableSource) -> Result<Self, FormatError> {
        let text = source.read_text()?;
        Self::parse(&text)
    }

    /// Parses ODF text.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] on header or body shape violations.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let lines: Vec<&str> = text.split('\n').map(|line| line.trim_end_matches('\r')).collect();
        let (Some(version), Some(count_line)) = (lines.first(), lines.get(1)) else {
            return Err(FormatError::odf("missing version or HeaderLines line"));
        };
        let header_count = parse_header_count(count_line)?;

        let truncated = || FormatError::odf(format!("file ends inside {header_count} header lines"));
        let region_end = header_count.checked_add(2).ok_or_else(truncated)?;
        let declared = lines.get(2 .. region_end).ok_or_else(truncated)?;
        let blanks = declared.iter().filter(|line| split_header_line(line).is_none()).count();
        let body_start = region_end.checked_add(blanks).ok_or_else(truncated)?;
        let header_region = lines.get(2 .. body_start).ok_or_else(truncated)?;

        let mut odf = Self {
            version: (*version).to_string(),
            headers: Vec::new(),
            table: Table::default(),
        };
        for line in header_region {
            if let Some(entry) = split_header_line(line) {
                odf.upsert(entry);
            }
        }

        let body = text.get(body_offset(text, body_start) ..).unwrap_or_default();
        let columns = odf.header(COLUMN_NAMES_KEY).map(split_tabs);
        odf.table = Table::parse_tab_delimited(body, columns).map_err(|err| FormatError::odf(err.0))?;
        Ok(odf)
    }

    /// Renders the document as ODF text.
    ///
    /// Header order is `COLUMN_NAMES`, `COLUMN_TYPES`, `Model`, the remaining
    /// keys sorted, then `DataLines`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] when the CSV writer fails.
    pub fn write(&self) -> Result<String, FormatError> {
        let ordered = self.ordered_headers();
        let mut out = format!("{}\n{HEADER_LINES_KEY}={}\n", self.version, ordered.len());
        for entry in ordered {
            out.push_str(&entry.key);
            out.push(entry.separator.as_char());
            out.push_str(&entry.value);
            out.push('\n');
        }
        let body = self.table.write_tab_delimited().map_err(|err| FormatError::odf(err.0))?;
        out.push_str(&body);
        Ok(out)
    }

    /// Version line as read.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Header entries in file order.
    #[must_use]
    pub fn headers(&self) -> &[HeaderEntry] {
        &self.headers
    }

    /// Returns a header value by key.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.iter().find(|entry| entry.key == key).map(|entry| entry.value.as_str())
    }

    /// Sets a header value, keeping the position of an existing key.
    pub fn set_header(&mut self, key: &str, value: &str) {
        let separator = self
            .headers
            .iter()
            .find(|entry| entry.key == key)
            .map_or(HeaderSeparator::Equals, |entry| entry.separator);
        self.upsert(HeaderEntry {
            key: key.to_string(),
            value: value.to_string(),
            separator,
        });
    }

    /// The `Model` header value.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.header(MODEL_KEY)
    }

    /// Body column names.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.table.columns()
    }

    /// Body rows.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Number of body rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// Number of body columns.
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.table.col_count()
    }

    /// Inserts or replaces a header entry in place.
    fn upsert(&mut self, entry: HeaderEntry) {
        if let Some(existing) = self.headers.iter_mut().find(|existing| existing.key == entry.key)
        {
            *existing = entry;
        } else {
            self.headers.push(entry);
        }
    }

    /// Returns header entries in write order.
    fn ordered_headers(&self) -> Vec<&HeaderEntry> {
        let mut ordered: Vec<&HeaderEntry> = LEADING_KEYS
            .iter()
            .filter_map(|key| self.headers.iter().find(|entry| entry.key == *key))
            .collect();
        let reserved: BTreeSet<&str> =
            LEADING_KEYS.iter().copied().chain([DATA_LINES_KEY, HEADER_LINES_KEY]).collect();
        let mut rest: Vec<&HeaderEntry> =
            self.headers.iter().filter(|entry| !reserved.contains(entry.key.as_str())).collect();
        rest.sort_by(|left, right| left.key.cmp(&right.key));
        ordered.extend(rest);
        ordered.extend(self.headers.iter().find(|entry| entry.key == DATA_LINES_KEY));
        ordered
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a header line on the first `=`, or else the first `:`.
fn split_header_line(line: &str) -> Option<HeaderEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (separator, (key, value)) = trimmed
        .split_once('=')
        .map(|pair| (HeaderSeparator::Equals, pair))
        .or_else(|| trimmed.split_once(':').map(|pair| (HeaderSeparator::Colon, pair)))?;
    Some(HeaderEntry {
        key: key.trim().to_string(),
        value: value.trim().to_string(),
        separator,
    })
}

/// Reads the declared header count from the second line.
fn parse_header_count(line: &str) -> Result<usize, FormatError> {
    let entry = split_header_line(line)
        .ok_or_else(|| FormatError::odf(format!("second line is not a HeaderLines entry: '{line}'")))?;
    entry
        .value
        .parse::<usize>()
        .map_err(|err| FormatError::odf(format!("invalid header count '{}': {err}", entry.value)))
}

/// Byte offset of line `index` in `text`, counting `\n`-terminated lines.
///
/// Past the last line the offset exceeds `text.len()`.
fn body_offset(text: &str, index: usize) -> usize {
    text.split('\n').take(index).map(|line| line.len() + 1).sum()
}

/// Splits a tab-separated header value.
fn split_tabs(value: &str) -> Vec<String> {
    value.split('\t').map(str::to_string).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
