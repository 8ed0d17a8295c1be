//! Build orchestration: an explicit stage graph.
//!
//! Each stage declares the artifacts it consumes and produces; execution
//! order is computed from those declarations instead of being hard-coded in
//! the driver. The graph is tiny, but it makes the one real ordering
//! constraint structural: story validation consumes the catalog data
//! artifact, so the catalog is always materialized first.
//!
//! ```text
//! stage        consumes                      produces
//! ───────────  ────────────────────────────  ──────────────────────
//! project      -                             project-data
//! catalog      -                             catalog-data
//! glossary     -                             glossary-data
//! stories      catalog-data                  story-data
//! collections  project/catalog/story data    collection-documents
//! manifests    catalog-data                  iiif-manifests
//! ```
//!
//! Stages hand data to each other through the files they write (the data
//! directory is the interchange format), so any subset of stages can run on
//! its own against the artifacts already on disk.

use crate::collections::{self, CollectionsError};
use crate::config::{ConfigError, Layout, SiteConfig};
use crate::iiif::{self, ManifestError};
use crate::remote::RemoteValidator;
use crate::tabular::{self, TabularError};
use crate::transform::TransformError;
use crate::transform::{catalog, glossary, project, story};
use crate::types::Row;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

pub const PROJECT_CSV: &str = "project.csv";
pub const OBJECTS_CSV: &str = "objects.csv";
pub const GLOSSARY_CSV: &str = "glossary.csv";
pub const STORY_CSV_PREFIX: &str = "story-";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tabular(#[from] TabularError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Collections(#[from] CollectionsError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("stage graph cycle involving: {0}")]
    Cycle(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Project,
    Catalog,
    Glossary,
    Stories,
    Collections,
    Manifests,
}

/// One node in the stage graph.
#[derive(Debug)]
pub struct Stage {
    pub name: &'static str,
    pub kind: StageKind,
    pub consumes: &'static [&'static str],
    pub produces: &'static [&'static str],
}

/// All stages in declaration order. Declaration order is the tiebreak for
/// topological ordering, so builds are deterministic.
pub const STAGES: &[Stage] = &[
    Stage {
        name: "project",
        kind: StageKind::Project,
        consumes: &[],
        produces: &["project-data"],
    },
    Stage {
        name: "catalog",
        kind: StageKind::Catalog,
        consumes: &[],
        produces: &["catalog-data"],
    },
    Stage {
        name: "glossary",
        kind: StageKind::Glossary,
        consumes: &[],
        produces: &["glossary-data"],
    },
    Stage {
        name: "stories",
        kind: StageKind::Stories,
        consumes: &["catalog-data"],
        produces: &["story-data"],
    },
    Stage {
        name: "collections",
        kind: StageKind::Collections,
        consumes: &["project-data", "catalog-data", "story-data"],
        produces: &["collection-documents"],
    },
    Stage {
        name: "manifests",
        kind: StageKind::Manifests,
        consumes: &["catalog-data"],
        produces: &["iiif-manifests"],
    },
];

/// Everything a stage needs to run.
pub struct BuildContext<'a> {
    pub layout: Layout,
    pub config: SiteConfig,
    pub validator: &'a dyn RemoteValidator,
}

/// What one stage did, for console reporting. Findings are diagnostics a
/// curator should look at; notes are progress summaries.
#[derive(Debug)]
pub struct StageReport {
    pub stage: &'static str,
    pub findings: Vec<String>,
    pub notes: Vec<String>,
}

impl StageReport {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            findings: Vec::new(),
            notes: Vec::new(),
        }
    }

    fn note(&mut self, line: impl Into<String>) {
        self.notes.push(line.into());
    }

    fn extend(&mut self, findings: impl IntoIterator<Item = String>) {
        self.findings.extend(findings);
    }
}

/// Run the full pipeline.
pub fn run(ctx: &BuildContext) -> Result<Vec<StageReport>, PipelineError> {
    let names: Vec<&str> = STAGES.iter().map(|s| s.name).collect();
    run_stages(ctx, &names)
}

/// Run a subset of stages in topological order.
///
/// Artifacts consumed from stages outside the subset are assumed to exist
/// on disk from a previous run; the stage itself reports when they don't.
pub fn run_stages(ctx: &BuildContext, names: &[&str]) -> Result<Vec<StageReport>, PipelineError> {
    let mut selected = Vec::new();
    for name in names {
        let stage = STAGES
            .iter()
            .find(|s| s.name == *name)
            .ok_or_else(|| PipelineError::UnknownStage((*name).to_string()))?;
        selected.push(stage);
    }

    let ordered = execution_order(&selected)?;
    let mut reports = Vec::with_capacity(ordered.len());
    for stage in ordered {
        reports.push(run_stage(ctx, stage)?);
    }
    Ok(reports)
}

/// Kahn's algorithm over the selected stages, with declaration order as the
/// tiebreak. Edges only exist between stages inside the selection; anything
/// consumed from outside it is satisfied by the filesystem.
fn execution_order<'s>(selected: &[&'s Stage]) -> Result<Vec<&'s Stage>, PipelineError> {
    let produced_by = |artifact: &str| -> Option<usize> {
        selected
            .iter()
            .position(|s| s.produces.contains(&artifact))
    };

    let mut indegree: Vec<usize> = selected
        .iter()
        .map(|stage| {
            stage
                .consumes
                .iter()
                .filter(|a| produced_by(a).is_some())
                .count()
        })
        .collect();

    let mut order = Vec::with_capacity(selected.len());
    let mut placed = vec![false; selected.len()];

    while order.len() < selected.len() {
        let Some(next) = (0..selected.len()).find(|&i| !placed[i] && indegree[i] == 0) else {
            let stuck: Vec<&str> = selected
                .iter()
                .zip(&placed)
                .filter(|(_, done)| !**done)
                .map(|(s, _)| s.name)
                .collect();
            return Err(PipelineError::Cycle(stuck.join(", ")));
        };
        placed[next] = true;
        order.push(selected[next]);
        for (i, stage) in selected.iter().enumerate() {
            if placed[i] {
                continue;
            }
            for artifact in stage.consumes {
                if produced_by(artifact) == Some(next) {
                    indegree[i] -= 1;
                }
            }
        }
    }
    Ok(order)
}

fn run_stage(ctx: &BuildContext, stage: &Stage) -> Result<StageReport, PipelineError> {
    match stage.kind {
        StageKind::Project => run_project(ctx),
        StageKind::Catalog => run_catalog(ctx),
        StageKind::Glossary => run_glossary(ctx),
        StageKind::Stories => run_stories(ctx),
        StageKind::Collections => run_collections(ctx),
        StageKind::Manifests => run_manifests(ctx),
    }
}

// ---------------------------------------------------------------------------
// Stage implementations
// ---------------------------------------------------------------------------

fn run_project(ctx: &BuildContext) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("project");
    let path = ctx.layout.structures_dir.join(PROJECT_CSV);
    let Some(table) = tabular::load_rows(&path)? else {
        report.note(format!("{PROJECT_CSV} not found, skipped"));
        return Ok(report);
    };
    report.extend(table.diagnostics);

    let outcome = project::transform(table.rows);
    report.extend(outcome.diagnostics);
    collections::write_project_data(&ctx.layout.data_dir, &outcome.record)?;
    report.note(format!(
        "{} written ({} settings, {} stories)",
        collections::PROJECT_DATA_FILE,
        outcome.record.settings.len(),
        outcome.record.stories.len()
    ));
    Ok(report)
}

fn run_catalog(ctx: &BuildContext) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("catalog");
    let path = ctx.layout.structures_dir.join(OBJECTS_CSV);
    let Some(table) = tabular::load_rows(&path)? else {
        report.note(format!("{OBJECTS_CSV} not found, skipped"));
        return Ok(report);
    };
    report.extend(table.diagnostics);

    let outcome = catalog::transform(table.rows, &catalog_context(ctx));
    report.extend(outcome.diagnostics);
    collections::write_rows_data(
        &ctx.layout.data_dir.join(collections::OBJECTS_DATA_FILE),
        &outcome.rows,
    )?;
    report.note(format!(
        "{} written ({} objects)",
        collections::OBJECTS_DATA_FILE,
        outcome.rows.len()
    ));
    Ok(report)
}

fn run_glossary(ctx: &BuildContext) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("glossary");
    let path = ctx.layout.structures_dir.join(GLOSSARY_CSV);
    let Some(table) = tabular::load_rows(&path)? else {
        report.note(format!("{GLOSSARY_CSV} not found, skipped"));
        return Ok(report);
    };
    report.extend(table.diagnostics);

    let outcome = glossary::transform(table.rows);
    report.extend(outcome.diagnostics);
    collections::write_rows_data(
        &ctx.layout.data_dir.join(collections::GLOSSARY_DATA_FILE),
        &outcome.rows,
    )?;
    report.note(format!(
        "{} written ({} terms)",
        collections::GLOSSARY_DATA_FILE,
        outcome.rows.len()
    ));
    Ok(report)
}

fn run_stories(ctx: &BuildContext) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("stories");
    let sources = story_csv_files(&ctx.layout.structures_dir)?;
    if sources.is_empty() {
        report.note("no story files found, skipped");
        return Ok(report);
    }

    let index = story::CatalogIndex::load(&ctx.layout.data_dir, &ctx.layout.images_dir)?;
    if index.is_none() {
        report.note("catalog data not found, object references not validated");
    }

    for (number, path) in sources {
        let Some(table) = tabular::load_rows(&path)? else {
            continue;
        };
        report.extend(table.diagnostics);

        let story_ctx = story::StoryContext {
            texts_dir: &ctx.layout.texts_dir,
            catalog: index.as_ref(),
        };
        let outcome = story::transform(table.rows, &story_ctx)?;
        report.extend(outcome.diagnostics);
        collections::write_story_data(
            &ctx.layout.data_dir,
            &number,
            &outcome.rows,
            &outcome.warnings,
        )?;
        report.note(format!(
            "{} written ({} steps, {} warnings)",
            collections::story_data_file(&number),
            outcome.rows.len(),
            outcome.warnings.len()
        ));
    }
    Ok(report)
}

fn run_collections(ctx: &BuildContext) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("collections");
    let layout = &ctx.layout;

    match read_rows_data(&layout.data_dir.join(collections::OBJECTS_DATA_FILE))? {
        Some(rows) => {
            let docs = collections::write_object_documents(&layout.objects_collection_dir, &rows)?;
            report.extend(docs.diagnostics);
            report.note(format!("{} object pages", docs.written));
        }
        None => report.note("catalog data not found, object pages skipped"),
    }

    let docs = collections::write_glossary_documents(
        &layout.glossary_collection_dir,
        &layout.glossary_texts_dir(),
    )?;
    report.extend(docs.diagnostics);
    report.note(format!("{} glossary pages", docs.written));

    match read_project_record(&layout.data_dir)? {
        Some(record) => {
            let docs = collections::write_story_documents(
                &layout.stories_collection_dir,
                &record,
                &layout.data_dir,
            )?;
            report.extend(docs.diagnostics);
            report.note(format!("{} story pages", docs.written));
        }
        None => report.note("project data not found, story pages skipped"),
    }
    Ok(report)
}

fn run_manifests(ctx: &BuildContext) -> Result<StageReport, PipelineError> {
    let mut report = StageReport::new("manifests");
    let rows = read_rows_data(&ctx.layout.data_dir.join(collections::OBJECTS_DATA_FILE))?
        .unwrap_or_default();
    let result = iiif::write_manifests(&ctx.layout.iiif_dir, &ctx.config.base_url, &rows)?;
    report.extend(result.diagnostics);
    report.note(format!("{} manifests", result.written));
    Ok(report)
}

fn catalog_context<'a>(ctx: &'a BuildContext) -> catalog::CatalogContext<'a> {
    catalog::CatalogContext {
        root: &ctx.layout.root,
        images_dir: &ctx.layout.images_dir,
        validator: ctx.validator,
    }
}

/// Story CSVs in the structures directory, sorted by filename: `story-1.csv`
/// yields the unit number `1`.
fn story_csv_files(structures_dir: &std::path::Path) -> Result<Vec<(String, PathBuf)>, PipelineError> {
    let entries = match fs::read_dir(structures_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let number = name.strip_prefix(STORY_CSV_PREFIX)?.strip_suffix(".csv")?;
            if number.is_empty() {
                return None;
            }
            Some((number.to_string(), path.clone()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Read a previously materialized row-array data document. `Ok(None)` when
/// it has not been generated yet.
fn read_rows_data(path: &std::path::Path) -> Result<Option<Vec<Row>>, PipelineError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Rebuild the project record from its data document.
fn read_project_record(
    data_dir: &std::path::Path,
) -> Result<Option<project::ProjectRecord>, PipelineError> {
    let path = data_dir.join(collections::PROJECT_DATA_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value: Value = serde_json::from_str(&raw)?;

    let mut record = project::ProjectRecord::default();
    if let Value::Object(map) = value {
        for (key, entry) in map {
            if key == "stories" {
                record.stories = serde_json::from_value(entry)?;
            } else if let Value::String(text) = entry {
                record.settings.push((key, text));
            }
        }
    }
    Ok(Some(record))
}

// ---------------------------------------------------------------------------
// Check mode: transform everything, write nothing
// ---------------------------------------------------------------------------

/// Validate the whole project without touching the output directories.
///
/// Reference validation uses the in-memory catalog outcome instead of the
/// materialized data document, so `check` works on a pristine checkout.
pub fn check(ctx: &BuildContext) -> Result<Vec<StageReport>, PipelineError> {
    let layout = &ctx.layout;
    let mut reports = Vec::new();

    let mut report = StageReport::new("project");
    match tabular::load_rows(&layout.structures_dir.join(PROJECT_CSV))? {
        Some(table) => {
            report.extend(table.diagnostics);
            let outcome = project::transform(table.rows);
            report.extend(outcome.diagnostics);
            report.note(format!(
                "{} settings, {} stories",
                outcome.record.settings.len(),
                outcome.record.stories.len()
            ));
        }
        None => report.note(format!("{PROJECT_CSV} not found")),
    }
    reports.push(report);

    let mut report = StageReport::new("catalog");
    let mut catalog_rows = Vec::new();
    match tabular::load_rows(&layout.structures_dir.join(OBJECTS_CSV))? {
        Some(table) => {
            report.extend(table.diagnostics);
            let outcome = catalog::transform(table.rows, &catalog_context(ctx));
            report.extend(outcome.diagnostics);
            report.note(format!("{} objects", outcome.rows.len()));
            catalog_rows = outcome.rows;
        }
        None => report.note(format!("{OBJECTS_CSV} not found")),
    }
    reports.push(report);

    let mut report = StageReport::new("glossary");
    match tabular::load_rows(&layout.structures_dir.join(GLOSSARY_CSV))? {
        Some(table) => {
            report.extend(table.diagnostics);
            let outcome = glossary::transform(table.rows);
            report.extend(outcome.diagnostics);
            report.note(format!("{} terms", outcome.rows.len()));
        }
        None => report.note(format!("{GLOSSARY_CSV} not found")),
    }
    reports.push(report);

    let index = story::CatalogIndex::from_rows(&catalog_rows, &layout.images_dir);
    let mut report = StageReport::new("stories");
    for (number, path) in story_csv_files(&layout.structures_dir)? {
        let Some(table) = tabular::load_rows(&path)? else {
            continue;
        };
        report.extend(table.diagnostics);
        let story_ctx = story::StoryContext {
            texts_dir: &layout.texts_dir,
            catalog: Some(&index),
        };
        let outcome = story::transform(table.rows, &story_ctx)?;
        report.extend(outcome.diagnostics);
        report.note(format!(
            "story {number}: {} steps, {} warnings",
            outcome.rows.len(),
            outcome.warnings.len()
        ));
    }
    reports.push(report);

    Ok(reports)
}

/// True when any report carries diagnostics a curator should look at.
pub fn has_findings(reports: &[StageReport]) -> bool {
    reports.iter().any(|r| !r.findings.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn by_name(names: &[&str]) -> Vec<&'static Stage> {
        names
            .iter()
            .map(|n| STAGES.iter().find(|s| s.name == *n).unwrap())
            .collect()
    }

    #[test]
    fn full_graph_orders_catalog_before_stories() {
        let order = execution_order(&by_name(&[
            "stories",
            "collections",
            "manifests",
            "glossary",
            "catalog",
            "project",
        ]))
        .unwrap();
        let pos = |name: &str| order.iter().position(|s| s.name == name).unwrap();
        assert!(pos("catalog") < pos("stories"));
        assert!(pos("stories") < pos("collections"));
        assert!(pos("catalog") < pos("manifests"));
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let order = execution_order(&by_name(&["glossary", "catalog", "project"])).unwrap();
        let names: Vec<&str> = order.iter().map(|s| s.name).collect();
        // No edges among these three: selection order is kept.
        assert_eq!(names, vec!["glossary", "catalog", "project"]);
    }

    #[test]
    fn subset_without_producers_still_runs() {
        // collections alone: its inputs come from disk, not from the graph.
        let order = execution_order(&by_name(&["collections"])).unwrap();
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn cycle_detected() {
        static A: Stage = Stage {
            name: "a",
            kind: StageKind::Project,
            consumes: &["beta"],
            produces: &["alpha"],
        };
        static B: Stage = Stage {
            name: "b",
            kind: StageKind::Catalog,
            consumes: &["alpha"],
            produces: &["beta"],
        };
        let err = execution_order(&[&A, &B]).unwrap_err();
        assert!(matches!(err, PipelineError::Cycle(_)));
    }

    #[test]
    fn unknown_stage_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = SiteConfig::default();
        let ctx = BuildContext {
            layout: Layout::resolve(tmp.path(), &config),
            config: config.clone(),
            validator: &crate::remote::SkipValidator,
        };
        let err = run_stages(&ctx, &["nonsense"]).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStage(_)));
    }

    #[test]
    fn every_consumed_artifact_has_a_producer_in_the_full_graph() {
        let produced: HashSet<&str> = STAGES.iter().flat_map(|s| s.produces).copied().collect();
        for stage in STAGES {
            for artifact in stage.consumes {
                assert!(produced.contains(artifact), "{artifact} has no producer");
            }
        }
    }

    #[test]
    fn story_files_sorted_and_numbered() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in ["story-2.csv", "story-1.csv", "objects.csv", "story-.csv"] {
            fs::write(tmp.path().join(name), "step\n1\n").unwrap();
        }
        let files = story_csv_files(tmp.path()).unwrap();
        let numbers: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2"]);
    }

    #[test]
    fn missing_structures_dir_yields_no_story_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let files = story_csv_files(&tmp.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }
}
