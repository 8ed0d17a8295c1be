//! Glossary record transformation.
//!
//! The glossary sheet is flat reference data keyed by `term_id`; cleanup is
//! the common trio (instruction column, blank fill, empty-key drop) plus the
//! same filename-safety rule catalog keys follow, since each term becomes a
//! `<term_id>.md` collection document.

use crate::tabular::{drop_instruction_column, drop_rows_with_empty_key};
use crate::types::{Row, filesystem_safe};

pub const KEY_COLUMN: &str = "term_id";

#[derive(Debug, Default)]
pub struct GlossaryOutcome {
    pub rows: Vec<Row>,
    pub diagnostics: Vec<String>,
}

pub fn transform(rows: Vec<Row>) -> GlossaryOutcome {
    let rows = drop_rows_with_empty_key(drop_instruction_column(rows), KEY_COLUMN);

    let mut outcome = GlossaryOutcome::default();
    for mut row in rows {
        let term_id = row.value(KEY_COLUMN).trim().to_string();
        row.set(KEY_COLUMN, term_id.as_str());
        if !filesystem_safe(&term_id) || term_id.chars().any(char::is_whitespace) {
            outcome.diagnostics.push(format!(
                "glossary term \"{term_id}\": invalid term_id (must be a single word without path characters)"
            ));
        }
        outcome.rows.push(row);
    }
    outcome
}
