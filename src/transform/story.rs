//! Story (unit) transformation: ordered step records.
//!
//! A story sheet is an ordered sequence of steps. Each step may reference a
//! catalog object (`object` column), carry viewer coordinates (`x`, `y`,
//! `zoom`), and point at any number of markdown panels through
//! `<layer>_file` columns (`layer1_file`, `layer2_file`, ...).
//!
//! The transformer:
//!
//! 1. Applies the common cleanup (instruction column, fully-blank rows).
//! 2. Checks every non-blank `object` reference against the materialized
//!    catalog; an unknown key or an object without a usable image source is
//!    a structured [`Warning`], never a dropped step.
//! 3. Resolves every `<layer>_file` into `<layer>_title` / `<layer>_text`
//!    through the markdown resolver. A missing fragment substitutes the
//!    missing-content sentinel and a visible callout so the gap shows up in
//!    the rendered story instead of silently disappearing.
//! 4. Defaults blank coordinates (`x`/`y` → 0.5, `zoom` → 1). Non-blank
//!    values pass through untouched, including non-numeric strings — the
//!    viewer owns number parsing.
//!
//! Reference validation needs the catalog collection to exist already. When
//! it does not (first run, or a project without objects), validation is
//! skipped silently; the pipeline stage graph is what guarantees the catalog
//! is materialized first in a normal build.

use crate::config::{
    DEFAULT_X, DEFAULT_Y, DEFAULT_ZOOM, MISSING_CONTENT_TITLE, missing_content_callout,
};
use crate::markdown;
use crate::tabular::{drop_blank_rows, drop_instruction_column};
use crate::transform::TransformError;
use crate::transform::catalog;
use crate::types::{Row, Warning, WarningKind, WarningSource};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const STEP_COLUMN: &str = "step";
pub const OBJECT_COLUMN: &str = "object";
pub const LAYER_FILE_SUFFIX: &str = "_file";

/// Lookup over the materialized catalog: which objects exist, and which of
/// them can actually show an image.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    entries: HashMap<String, bool>,
}

impl CatalogIndex {
    /// Load the index from the materialized `objects.json`, or `None` when
    /// the collection has not been generated (reference validation is then
    /// skipped).
    pub fn load(data_dir: &Path, images_dir: &Path) -> Result<Option<Self>, TransformError> {
        let path = data_dir.join(crate::collections::OBJECTS_DATA_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let rows: Vec<Row> = serde_json::from_str(&raw)?;
        Ok(Some(Self::from_rows(&rows, images_dir)))
    }

    /// Build the index directly from transformed catalog rows (used by
    /// `check`, which validates without materializing).
    pub fn from_rows(rows: &[Row], images_dir: &Path) -> Self {
        let entries = rows
            .iter()
            .map(|row| {
                let id = row.value(catalog::KEY_COLUMN).to_string();
                let has_source = !row.value(catalog::MANIFEST_COLUMN).is_empty()
                    || catalog::local_image_for(images_dir, &id).is_some();
                (id, has_source)
            })
            .collect();
        Self { entries }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn has_image_source(&self, id: &str) -> bool {
        self.entries.get(id).copied().unwrap_or(false)
    }
}

pub struct StoryContext<'a> {
    /// Root for markdown fragment resolution.
    pub texts_dir: &'a Path,
    /// `None` skips reference validation entirely.
    pub catalog: Option<&'a CatalogIndex>,
}

#[derive(Debug, Default)]
pub struct StoryOutcome {
    pub rows: Vec<Row>,
    /// Unit-level ordered warning list, fed to the `_metadata` element.
    pub warnings: Vec<Warning>,
    pub diagnostics: Vec<String>,
}

pub fn transform(rows: Vec<Row>, ctx: &StoryContext) -> Result<StoryOutcome, TransformError> {
    let rows = drop_blank_rows(drop_instruction_column(rows));

    let mut outcome = StoryOutcome::default();
    for (idx, row) in rows.into_iter().enumerate() {
        let step_id = step_identifier(&row, idx);
        let (row, mut warnings) = check_object_reference(row, &step_id, ctx);
        let (row, mut layer_warnings) = resolve_layers(row, &step_id, ctx)?;
        let row = apply_coordinate_defaults(row);

        outcome.warnings.append(&mut warnings);
        outcome.warnings.append(&mut layer_warnings);
        outcome.rows.push(row);
    }
    outcome.diagnostics = outcome
        .warnings
        .iter()
        .map(|w| format!("step {}: {}", w.step, w.message))
        .collect();
    Ok(outcome)
}

/// The `step` value, or a positional fallback for diagnostics when blank.
fn step_identifier(row: &Row, idx: usize) -> String {
    let step = row.value(STEP_COLUMN).trim();
    if step.is_empty() {
        format!("row {}", idx + 1)
    } else {
        step.to_string()
    }
}

/// Validate the `object` foreign key. The step is annotated, never dropped.
fn check_object_reference(row: Row, step_id: &str, ctx: &StoryContext) -> (Row, Vec<Warning>) {
    let mut warnings = Vec::new();
    let Some(index) = ctx.catalog else {
        return (row, warnings);
    };

    let reference = row.value(OBJECT_COLUMN).trim();
    if reference.is_empty() {
        return (row, warnings);
    }

    if !index.contains(reference) {
        warnings.push(Warning {
            step: step_id.to_string(),
            source: WarningSource::Object,
            kind: WarningKind::ReferenceMissing,
            message: format!("Object \"{reference}\" not found in the catalog"),
        });
    } else if !index.has_image_source(reference) {
        warnings.push(Warning {
            step: step_id.to_string(),
            source: WarningSource::Object,
            kind: WarningKind::AssetMissing,
            message: format!("Object \"{reference}\" has no usable image source"),
        });
    }
    (row, warnings)
}

/// Resolve every `<layer>_file` column into `<layer>_title` /
/// `<layer>_text`, dropping the file column afterward (the renderer never
/// sees logical paths, only resolved content).
fn resolve_layers(
    mut row: Row,
    step_id: &str,
    ctx: &StoryContext,
) -> Result<(Row, Vec<Warning>), TransformError> {
    let mut warnings = Vec::new();

    let layer_columns: Vec<String> = row
        .columns()
        .filter(|c| c.ends_with(LAYER_FILE_SUFFIX) && c.len() > LAYER_FILE_SUFFIX.len())
        .map(str::to_string)
        .collect();

    for column in layer_columns {
        let layer = column
            .strip_suffix(LAYER_FILE_SUFFIX)
            .unwrap_or(&column)
            .to_string();
        let position = row.position(&column).unwrap_or(row.len());
        let reference = row.remove(&column).unwrap_or_default().trim().to_string();

        let (title, text) = if reference.is_empty() {
            (String::new(), String::new())
        } else {
            match markdown::resolve(ctx.texts_dir, &reference)? {
                Some(fragment) => (fragment.title, fragment.content),
                None => {
                    warnings.push(Warning {
                        step: step_id.to_string(),
                        source: WarningSource::Panel,
                        kind: WarningKind::AssetMissing,
                        message: format!(
                            "Layer \"{layer}\" content file not found: {reference}"
                        ),
                    });
                    (
                        MISSING_CONTENT_TITLE.to_string(),
                        missing_content_callout(&reference),
                    )
                }
            }
        };

        row.insert_at(position, format!("{layer}_title"), title);
        row.insert_at(position + 1, format!("{layer}_text"), text);
    }
    Ok((row, warnings))
}

/// Blank coordinates get viewer defaults; anything non-blank passes through
/// unchanged, even a non-numeric string.
fn apply_coordinate_defaults(mut row: Row) -> Row {
    for (column, default) in [("x", DEFAULT_X), ("y", DEFAULT_Y), ("zoom", DEFAULT_ZOOM)] {
        if row.value(column).trim().is_empty() {
            row.set(column, default);
        }
    }
    row
}
