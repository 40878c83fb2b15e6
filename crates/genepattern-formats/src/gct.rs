// crates/genepattern-formats/src/gct.rs
// ============================================================================
// Module: GCT Codec
// Description: Reader and writer for the GCT expression matrix format.
// Purpose: Parse `#1.2` matrices into a row-keyed table and write them back.
// Dependencies: csv
// ============================================================================

//! ## Overview
//! A GCT file is a version marker line, a `<rows>\t<cols>` dimension line, a
//! column header line whose first two labels name the composite row key
//! (normally `Name` and `Description`), and one line per row.
//! Invariants:
//! - The parsed body has exactly the declared number of rows and data columns.
//! - Writing always emits the `#1.2` marker and the table's own dimensions.
//! - A parsed matrix writes its header and row lines back byte for byte,
//!   keeping the file's line ending and final-newline state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::error::FormatError;
use crate::source::TableSource;
use crate::table::Table;
use crate::table::read_records;
use crate::table::write_records;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version marker written at the top of every GCT file.
pub const GCT_VERSION_MARKER: &str = "#1.2";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Composite row key of a GCT row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    /// Row identifier, usually a probe or gene name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

/// A parsed GCT matrix.
///
/// # Invariants
/// - `keys.len() == data.row_count()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gct {
    /// Version marker as read, without the leading `#`.
    version: String,
    /// Labels for the two key columns.
    key_labels: [String; 2],
    /// Row keys in file order.
    keys: Vec<RowKey>,
    /// Data columns, excluding the key columns.
    data: Table,
    /// Line ending of the marker line.
    line_ending: LineEnding,
    /// Text after the dimension line for parsed matrices.
    raw_body: Option<String>,
}

/// Line terminator used by the marker and dimension lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Terminator text.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

impl Gct {
    /// Builds a matrix from keys and a data table.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] when key and row counts differ.
    pub fn new(keys: Vec<RowKey>, data: Table) -> Result<Self, FormatError> {
        if keys.len() != data.row_count() {
            return Err(FormatError::gct(format!(
                "{} row keys for {} data rows",
                keys.len(),
                data.row_count()
            )));
        }
        Ok(Self {
            version: "1.2".to_string(),
            key_labels: ["Name".to_string(), "Description".to_string()],
            keys,
            data,
            line_ending: LineEnding::Lf,
            raw_body: None,
        })
    }

    /// Reads and parses a GCT file from any table source.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] when the source is unreadable or malformed.
    pub fn read(source: TableSource) -> Result<Self, FormatError> {
        let text = source.read_text()?;
        Self::parse(&text)
    }

    /// Parses GCT text.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] on header or body shape violations.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let mut lines = text.splitn(3, '\n');
        let marker_line = lines.next().unwrap_or_default();
        let line_ending =
            if marker_line.ends_with('\r') { LineEnding::CrLf } else { LineEnding::Lf };
        let marker = marker_line.trim_end_matches('\r');
        let Some(version) = marker.strip_prefix('#') else {
            return Err(FormatError::gct("missing version marker line"));
        };
        let dims_line = lines.next().ok_or_else(|| FormatError::gct("missing dimension line"))?;
        let (declared_rows, declared_cols) = parse_dimensions(dims_line)?;
        let body = lines.next().unwrap_or_default();

        let records = read_records(body).map_err(|err| FormatError::gct(err.0))?;
        let mut records = records.into_iter();
        let header = records.next().ok_or_else(|| FormatError::gct("missing column header line"))?;
        let mut header = header.into_iter();
        let (Some(name_label), Some(description_label)) = (header.next(), header.next()) else {
            return Err(FormatError::gct("column header needs two row key labels"));
        };
        let columns: Vec<String> = header.collect();

        let mut keys = Vec::new();
        let mut rows = Vec::new();
        for record in records {
            let mut fields = record.into_iter();
            let (Some(name), Some(description)) = (fields.next(), fields.next()) else {
                return Err(FormatError::gct(format!("row {} lacks a row key", keys.len() + 1)));
            };
            keys.push(RowKey {
                name,
                description,
            });
            rows.push(fields.collect());
        }
        let data = Table::new(columns, rows).map_err(|err| FormatError::gct(err.0))?;

        if data.row_count() != declared_rows {
            return Err(FormatError::gct(format!(
                "declared {declared_rows} rows, found {}",
                data.row_count()
            )));
        }
        if data.col_count() != declared_cols {
            return Err(FormatError::gct(format!(
                "declared {declared_cols} columns, found {}",
                data.col_count()
            )));
        }
        Ok(Self {
            version: version.trim().to_string(),
            key_labels: [name_label, description_label],
            keys,
            data,
            line_ending,
            raw_body: Some(body.to_string()),
        })
    }

    /// Renders the matrix as GCT text.
    ///
    /// A parsed matrix writes its column header and rows verbatim. A built
    /// matrix uses `\n` terminators.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] when the CSV writer fails.
    pub fn write(&self) -> Result<String, FormatError> {
        let newline = self.line_ending.as_str();
        let mut out = format!(
            "{GCT_VERSION_MARKER}{newline}{}\t{}{newline}",
            self.data.row_count(),
            self.data.col_count()
        );
        if let Some(body) = &self.raw_body {
            out.push_str(body);
            return Ok(out);
        }
        let header = self
            .key_labels
            .iter()
            .map(String::as_str)
            .chain(self.data.columns().iter().map(String::as_str));
        let rows = self.keys.iter().zip(self.data.rows()).map(|(key, row)| {
            [key.name.as_str(), key.description.as_str()]
                .into_iter()
                .chain(row.iter().map(String::as_str))
        });
        let header_text = write_records([header]).map_err(|err| FormatError::gct(err.0))?;
        let body_text = write_records(rows).map_err(|err| FormatError::gct(err.0))?;
        out.push_str(&header_text);
        out.push_str(&body_text);
        Ok(out)
    }

    /// Version marker as read, without the leading `#`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Labels of the two row key columns.
    #[must_use]
    pub const fn key_labels(&self) -> &[String; 2] {
        &self.key_labels
    }

    /// Row keys in file order.
    #[must_use]
    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    /// Data columns, excluding the row key.
    #[must_use]
    pub const fn data(&self) -> &Table {
        &self.data
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.data.row_count()
    }

    /// Number of data columns.
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.data.col_count()
    }

    /// Returns the data cells of the row with the given name.
    #[must_use]
    pub fn row(&self, name: &str) -> Option<&[String]> {
        let index = self.keys.iter().position(|key| key.name == name)?;
        self.data.rows().get(index).map(Vec::as_slice)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses the `<rows>\t<cols>` dimension line.
fn parse_dimensions(line: &str) -> Result<(usize, usize), FormatError> {
    let mut fields = line.trim_end_matches('\r').split('\t').filter(|field| !field.trim().is_empty());
    let (Some(rows), Some(cols)) = (fields.next(), fields.next()) else {
        return Err(FormatError::gct(format!("dimension line needs two counts: '{line}'")));
    };
    let rows = rows
        .trim()
        .parse::<usize>()
        .map_err(|err| FormatError::gct(format!("invalid row count '{rows}': {err}")))?;
    let cols = cols
        .trim()
        .parse::<usize>()
        .map_err(|err| FormatError::gct(format!("invalid column count '{cols}': {err}")))?;
    Ok((rows, cols))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
