//! Tabular loading: delimited files → ordered row records.
//!
//! The spreadsheet export is authored by curators, not engineers, so the
//! loader is deliberately forgiving:
//!
//! - Lines whose first non-whitespace character is `#` are author comments
//!   and are removed *before* parsing. Only whole comment lines are
//!   stripped — a `#` inside a value (a colour code like `#2c3e50`) is data.
//! - Columns whose header starts with `#` are authoring instructions and
//!   are dropped *after* parsing.
//! - Rows with the wrong field count are skipped with a diagnostic, never
//!   fatal.
//! - A missing file is a skip signal (`Ok(None)`), not an error: optional
//!   artifacts (glossary, individual stories) simply don't exist in every
//!   project.

use crate::config::{COMMENT_MARKER, INSTRUCTION_COLUMN};
use crate::types::Row;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// Parsed table plus the diagnostics produced while loading it.
#[derive(Debug, Default)]
pub struct Table {
    pub rows: Vec<Row>,
    pub diagnostics: Vec<String>,
}

/// Load a delimited file into ordered rows.
///
/// Returns `Ok(None)` when the file does not exist so callers can skip the
/// artifact with a console diagnostic instead of aborting the run.
pub fn load_rows(path: &Path) -> Result<Option<Table>, TabularError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(parse(&raw, &path.display().to_string())?))
}

/// Parse delimited content. Split from [`load_rows`] so tests can exercise
/// comment and field-count handling without touching the filesystem.
pub fn parse(raw: &str, origin: &str) -> Result<Table, TabularError> {
    let filtered = strip_comment_lines(raw);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(filtered.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::default();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                table
                    .diagnostics
                    .push(format!("{origin}: row {} skipped: {e}", idx + 2));
                continue;
            }
        };
        if record.len() != headers.len() {
            table.diagnostics.push(format!(
                "{origin}: row {} skipped: expected {} fields, got {}",
                idx + 2,
                headers.len(),
                record.len()
            ));
            continue;
        }
        let row = Row::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .filter(|(h, _)| !h.starts_with(COMMENT_MARKER))
                .map(|(h, v)| (h.clone(), v.to_string())),
        );
        table.rows.push(row);
    }
    Ok(table)
}

/// Remove lines whose first non-whitespace character is the comment marker.
///
/// A naive "strip from `#` to end of line" rule would corrupt values that
/// legitimately contain the marker, so only whole lines are removed.
fn strip_comment_lines(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        if line.trim_start().starts_with(COMMENT_MARKER) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Row cleanup helpers shared by all transformers
// ---------------------------------------------------------------------------

/// Drop the authoring-instruction column from every row, if present.
pub fn drop_instruction_column(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|mut row| {
            row.remove(INSTRUCTION_COLUMN);
            row
        })
        .collect()
}

/// Drop rows that are blank across all columns.
pub fn drop_blank_rows(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter().filter(|row| !row.is_blank()).collect()
}

/// Drop rows whose primary key column is blank.
pub fn drop_rows_with_empty_key(rows: Vec<Row>, key: &str) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| !row.value(key).trim().is_empty())
        .collect()
}
