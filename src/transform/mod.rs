//! Per-entity-type record transformers.
//!
//! Each transformer takes the raw rows from the tabular loader and produces
//! validated, enriched rows plus diagnostics and (for stories) structured
//! warnings. Transformers are folds over pure per-row rules: a rule consumes
//! a `Row` and returns a new `Row` plus anything it has to report, so each
//! validation rule tests in isolation.
//!
//! | Module | Entity | Primary key |
//! |--------|--------|-------------|
//! | [`project`] | site settings + ordered story list | — |
//! | [`catalog`] | exhibit objects | `object_id` |
//! | [`glossary`] | glossary terms | `term_id` |
//! | [`story`] | ordered step sequences | `step` (diagnostic only) |

pub mod catalog;
pub mod glossary;
pub mod project;
pub mod story;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
