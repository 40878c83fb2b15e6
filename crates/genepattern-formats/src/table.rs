// crates/genepattern-formats/src/table.rs
// ============================================================================
// Module: Table
// Description: Column-labelled string grid backed by tab-delimited CSV I/O.
// Purpose: Hold codec bodies byte-exactly while offering numeric views.
// Dependencies: csv
// ============================================================================

//! ## Overview
//! [`Table`] stores every cell as the raw text read from the file. A parsed
//! table also keeps its source text so that a parse followed by a write
//! reproduces the body byte for byte, including line endings, blank lines,
//! and a missing final newline. Numeric access is a view computed on demand.
//! Invariants:
//! - Every row has exactly `columns.len()` cells.

// ============================================================================
// SECTION: Imports
// ============================================================================

use csv::QuoteStyle;
use csv::ReaderBuilder;
use csv::Terminator;
use csv::WriterBuilder;

// ============================================================================
// SECTION: Table
// ============================================================================

/// A rectangular grid of text cells with named columns.
///
/// # Invariants
/// - Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// Column labels.
    columns: Vec<String>,
    /// Row cells, in file order.
    rows: Vec<Vec<String>>,
    /// Source text for parsed tables, written back verbatim.
    raw: Option<String>,
}

/// Shape violation raised while building a [`Table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShapeError(pub String);

impl Table {
    /// Builds a table, checking every row against the column count.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] when a row width differs from the columns.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableShapeError> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableShapeError(format!(
                    "row {} has {} fields, expected {}",
                    index + 1,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self {
            columns,
            rows,
            raw: None,
        })
    }

    /// Parses headerless tab-delimited text.
    ///
    /// Blank lines are skipped in the grid but kept in the retained source
    /// text. When `columns` is `None`, columns are named `0..width` after the
    /// first row.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] on CSV failures or ragged rows.
    pub fn parse_tab_delimited(
        text: &str,
        columns: Option<Vec<String>>,
    ) -> Result<Self, TableShapeError> {
        let rows = read_records(text)?;
        let columns = match columns {
            Some(columns) => columns,
            None => {
                let width = rows.first().map_or(0, Vec::len);
                (0 .. width).map(|index| index.to_string()).collect()
            }
        };
        let mut table = Self::new(columns, rows)?;
        table.raw = Some(text.to_string());
        Ok(table)
    }

    /// Column labels.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row cells.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of data columns.
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the cell at `row`, `col`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|cells| cells.get(col)).map(String::as_str)
    }

    /// Returns all cells of the named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index).map(String::as_str)).collect())
    }

    /// Returns the grid parsed as floating point values, or `None` if any
    /// cell is not numeric.
    #[must_use]
    pub fn numeric_rows(&self) -> Option<Vec<Vec<f64>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.trim().parse::<f64>().ok()).collect())
            .collect()
    }

    /// Writes the rows as tab-delimited text with no header line.
    ///
    /// Parsed tables return their source text unchanged. Tables built with
    /// [`Table::new`] use `\n` terminators.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] when the CSV writer fails.
    pub fn write_tab_delimited(&self) -> Result<String, TableShapeError> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        write_records(self.rows.iter().map(|row| row.iter().map(String::as_str)))
    }
}

// ============================================================================
// SECTION: CSV Helpers
// ============================================================================

/// Reads tab-delimited records, skipping blank lines.
pub(crate) fn read_records(text: &str) -> Result<Vec<Vec<String>>, TableShapeError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| TableShapeError(err.to_string()))?;
        let row: Vec<String> =
            record.iter().map(|field| field.trim_end_matches('\r').to_string()).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Writes tab-delimited records without quoting.
pub(crate) fn write_records<'a, I, R>(records: I) -> Result<String, TableShapeError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = &'a str>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());
    for record in records {
        writer.write_record(record).map_err(|err| TableShapeError(err.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|err| TableShapeError(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| TableShapeError(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
