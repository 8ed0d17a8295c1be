//! Collection materialization: JSON data documents and per-entity files.
//!
//! Two output shapes, both consumed by the static-site renderer:
//!
//! - **Data documents** under `_data/`: one JSON array per artifact
//!   (`objects.json`, `glossary.json`, `story-<n>.json`) plus the project
//!   object (`project.json`). A story with warnings gets a synthetic first
//!   element `{"_metadata": true, "viewer_warnings": [...]}` so the viewer
//!   can surface authoring problems without a separate channel.
//! - **Collection documents** under `_collections/`: one front-matter file
//!   per addressable entity (object pages, glossary entries, story
//!   indices).
//!
//! Collection directories are purged before regeneration — full-replace
//! semantics, so an entity removed from the spreadsheet disappears from the
//! output instead of lingering from a previous run. Output is deterministic:
//! running twice on unchanged input produces byte-identical files.

use crate::markdown::split_front_matter;
use crate::transform::project::ProjectRecord;
use crate::types::{Row, StoryDescriptor, Warning, filesystem_safe};
use regex::Regex;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const OBJECTS_DATA_FILE: &str = "objects.json";
pub const GLOSSARY_DATA_FILE: &str = "glossary.json";
pub const PROJECT_DATA_FILE: &str = "project.json";

/// Data file name for one story collection.
pub fn story_data_file(number: &str) -> String {
    format!("story-{number}.json")
}

static TERM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"term_id:\s*(\S+)").expect("static regex"));

#[derive(Error, Debug)]
pub enum CollectionsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a document-writing pass produced.
#[derive(Debug, Default)]
pub struct DocumentReport {
    pub written: usize,
    pub diagnostics: Vec<String>,
}

// ---------------------------------------------------------------------------
// Data documents (_data/*.json)
// ---------------------------------------------------------------------------

/// Write one JSON array document of row records.
pub fn write_rows_data(path: &Path, rows: &[Row]) -> Result<(), CollectionsError> {
    write_json(path, &serde_json::to_value(rows)?)
}

/// Write the project record document.
pub fn write_project_data(data_dir: &Path, record: &ProjectRecord) -> Result<(), CollectionsError> {
    write_json(&data_dir.join(PROJECT_DATA_FILE), &record.to_json())
}

/// Write one story's data document, prepending the `_metadata` element only
/// when the unit actually has warnings.
pub fn write_story_data(
    data_dir: &Path,
    number: &str,
    rows: &[Row],
    warnings: &[Warning],
) -> Result<PathBuf, CollectionsError> {
    let mut elements: Vec<Value> = Vec::with_capacity(rows.len() + 1);
    if !warnings.is_empty() {
        elements.push(json!({
            "_metadata": true,
            "viewer_warnings": warnings,
        }));
    }
    for row in rows {
        elements.push(serde_json::to_value(row)?);
    }
    let path = data_dir.join(story_data_file(number));
    write_json(&path, &Value::Array(elements))?;
    Ok(path)
}

fn write_json(path: &Path, value: &Value) -> Result<(), CollectionsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Collection documents (_collections/*)
// ---------------------------------------------------------------------------

/// One page per catalog object: front matter from the row columns, body
/// from the description. Keys that are unsafe as filenames are skipped with
/// a diagnostic rather than written somewhere unexpected.
pub fn write_object_documents(dir: &Path, rows: &[Row]) -> Result<DocumentReport, CollectionsError> {
    purge_dir(dir)?;
    let mut report = DocumentReport::default();

    for row in rows {
        let id = row.value("object_id");
        if !filesystem_safe(id) || id.chars().any(char::is_whitespace) {
            report
                .diagnostics
                .push(format!("object \"{id}\": skipped, not usable as a filename"));
            continue;
        }

        let mut front = String::new();
        for (column, value) in row.iter() {
            if column == "description" {
                continue;
            }
            front.push_str(&format!("{column}: {}\n", yaml_quote(value)));
        }
        front.push_str("layout: object\n");

        let body = row.value("description");
        let content = format!("---\n{front}---\n\n{body}\n");
        fs::write(dir.join(format!("{id}.md")), content)?;
        report.written += 1;
    }
    Ok(report)
}

/// Glossary entries are authored as markdown fragments; materialization
/// copies them into the collection keyed by their front-matter `term_id`,
/// adding the layout the renderer expects.
pub fn write_glossary_documents(
    dir: &Path,
    source_dir: &Path,
) -> Result<DocumentReport, CollectionsError> {
    purge_dir(dir)?;
    let mut report = DocumentReport::default();

    if !source_dir.is_dir() {
        report.diagnostics.push(format!(
            "glossary source directory not found: {}",
            source_dir.display()
        ));
        return Ok(report);
    }

    let mut sources: Vec<PathBuf> = fs::read_dir(source_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
        })
        .collect();
    sources.sort();

    for source in &sources {
        let raw = fs::read_to_string(source)?;
        let (front_matter, body) = split_front_matter(&raw);
        let Some(front_matter) = front_matter else {
            report.diagnostics.push(format!(
                "glossary file {} skipped: no front matter",
                source.display()
            ));
            continue;
        };
        let Some(term_id) = TERM_ID_RE
            .captures(front_matter)
            .map(|caps| caps[1].to_string())
        else {
            report.diagnostics.push(format!(
                "glossary file {} skipped: no term_id in front matter",
                source.display()
            ));
            continue;
        };
        if !filesystem_safe(&term_id) {
            report.diagnostics.push(format!(
                "glossary term \"{term_id}\" skipped: not usable as a filename"
            ));
            continue;
        }

        let mut front = front_matter.to_string();
        if !front.ends_with('\n') {
            front.push('\n');
        }
        front.push_str("layout: glossary\n");
        let content = format!("---\n{front}---\n\n{}\n", body.trim());
        fs::write(dir.join(format!("{term_id}.md")), content)?;
        report.written += 1;
    }
    Ok(report)
}

/// One index page per story declared in the project record, pointing the
/// renderer at the story's data document. Stories whose data document was
/// never materialized (missing CSV) are skipped with a diagnostic.
pub fn write_story_documents(
    dir: &Path,
    record: &ProjectRecord,
    data_dir: &Path,
) -> Result<DocumentReport, CollectionsError> {
    purge_dir(dir)?;
    let mut report = DocumentReport::default();

    for story in &record.stories {
        if !data_dir.join(story_data_file(&story.number)).is_file() {
            report.diagnostics.push(format!(
                "story {}: no data document, index page skipped",
                story.number
            ));
            continue;
        }
        let content = story_document(story);
        fs::write(dir.join(format!("story-{}.md", story.number)), content)?;
        report.written += 1;
    }
    Ok(report)
}

fn story_document(story: &StoryDescriptor) -> String {
    let mut front = format!(
        "story_number: {}\ntitle: {}\n",
        yaml_quote(&story.number),
        yaml_quote(&story.title)
    );
    if let Some(subtitle) = &story.subtitle {
        front.push_str(&format!("subtitle: {}\n", yaml_quote(subtitle)));
    }
    front.push_str(&format!(
        "layout: story\ndata_file: story-{}\n",
        story.number
    ));
    format!("---\n{front}---\n")
}

/// Full-replace semantics: drop everything from the previous run.
fn purge_dir(dir: &Path) -> Result<(), std::io::Error> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

/// Double-quote a front-matter value, escaping embedded quotes. Quoting
/// everything keeps output deterministic regardless of value content.
fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{WarningKind, WarningSource};
    use tempfile::TempDir;

    fn object_rows() -> Vec<Row> {
        vec![
            Row::from_pairs([
                ("object_id", "vase"),
                ("title", "A \"blue\" vase"),
                ("description", "Hand-thrown stoneware."),
                ("object_warning", ""),
            ]),
            Row::from_pairs([
                ("object_id", "loom"),
                ("title", "Backstrap loom"),
                ("description", ""),
                ("object_warning", ""),
            ]),
        ]
    }

    fn sample_warning() -> Warning {
        Warning {
            step: "2".into(),
            source: WarningSource::Panel,
            kind: WarningKind::AssetMissing,
            message: "Layer \"layer1\" content file not found: intro.md".into(),
        }
    }

    #[test]
    fn story_data_without_warnings_has_no_metadata_element() {
        let tmp = TempDir::new().unwrap();
        let rows = vec![Row::from_pairs([("step", "1")])];
        let path = write_story_data(tmp.path(), "1", &rows, &[]).unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert!(value[0].get("_metadata").is_none());
    }

    #[test]
    fn story_data_with_warnings_prepends_metadata() {
        let tmp = TempDir::new().unwrap();
        let rows = vec![Row::from_pairs([("step", "1")])];
        let path = write_story_data(tmp.path(), "1", &rows, &[sample_warning()]).unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["_metadata"], true);
        assert_eq!(array[0]["viewer_warnings"][0]["type"], "panel");
        assert_eq!(array[1]["step"], "1");
    }

    #[test]
    fn materializer_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let rows = vec![Row::from_pairs([("step", "1"), ("x", "0.5")])];
        let path = write_story_data(tmp.path(), "7", &rows, &[sample_warning()]).unwrap();
        let first = fs::read(&path).unwrap();
        write_story_data(tmp.path(), "7", &rows, &[sample_warning()]).unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn object_documents_written_per_record() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_objects");
        let report = write_object_documents(&dir, &object_rows()).unwrap();
        assert_eq!(report.written, 2);

        let content = fs::read_to_string(dir.join("vase.md")).unwrap();
        assert!(content.starts_with("---\n"));
        assert!(content.contains("object_id: \"vase\""));
        assert!(content.contains("title: \"A \\\"blue\\\" vase\""));
        assert!(content.contains("layout: object"));
        assert!(content.contains("Hand-thrown stoneware."));
        // Body column stays out of the front matter.
        assert!(!content.contains("description:"));
    }

    #[test]
    fn unsafe_object_keys_not_written() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_objects");
        let rows = vec![Row::from_pairs([("object_id", "a/b"), ("description", "")])];
        let report = write_object_documents(&dir, &rows).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn stale_entities_purged_on_rerun() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_objects");
        write_object_documents(&dir, &object_rows()).unwrap();
        assert!(dir.join("loom.md").exists());

        let only_vase: Vec<Row> = object_rows().into_iter().take(1).collect();
        write_object_documents(&dir, &only_vase).unwrap();
        assert!(dir.join("vase.md").exists());
        assert!(!dir.join("loom.md").exists());
    }

    #[test]
    fn glossary_documents_gain_layout() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("texts/glossary");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("warp.md"),
            "---\nterm_id: warp\ntitle: \"Warp\"\n---\n\nThe lengthwise threads.\n",
        )
        .unwrap();
        let dir = tmp.path().join("_glossary");
        let report = write_glossary_documents(&dir, &source).unwrap();
        assert_eq!(report.written, 1);

        let content = fs::read_to_string(dir.join("warp.md")).unwrap();
        assert!(content.contains("term_id: warp"));
        assert!(content.contains("layout: glossary"));
        assert!(content.contains("The lengthwise threads."));
    }

    #[test]
    fn glossary_without_term_id_skipped() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("texts/glossary");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("odd.md"), "---\ntitle: \"No id\"\n---\nbody\n").unwrap();
        let dir = tmp.path().join("_glossary");
        let report = write_glossary_documents(&dir, &source).unwrap();
        assert_eq!(report.written, 0);
        assert!(report.diagnostics[0].contains("no term_id"));
    }

    #[test]
    fn missing_glossary_source_is_a_diagnostic() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_glossary");
        let report =
            write_glossary_documents(&dir, &tmp.path().join("texts/glossary")).unwrap();
        assert_eq!(report.written, 0);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(dir.exists());
    }

    #[test]
    fn story_documents_only_for_materialized_data() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("_data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("story-1.json"), "[]\n").unwrap();

        let record = ProjectRecord {
            settings: vec![],
            stories: vec![
                StoryDescriptor {
                    number: "1".into(),
                    title: "The Loom".into(),
                    subtitle: Some("Begin".into()),
                },
                StoryDescriptor {
                    number: "2".into(),
                    title: "Never converted".into(),
                    subtitle: None,
                },
            ],
        };
        let dir = tmp.path().join("_stories");
        let report = write_story_documents(&dir, &record, &data_dir).unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.diagnostics.len(), 1);

        let content = fs::read_to_string(dir.join("story-1.md")).unwrap();
        assert!(content.contains("story_number: \"1\""));
        assert!(content.contains("title: \"The Loom\""));
        assert!(content.contains("subtitle: \"Begin\""));
        assert!(content.contains("data_file: story-1"));
    }

    #[test]
    fn project_data_round_trips() {
        let tmp = TempDir::new().unwrap();
        let record = ProjectRecord {
            settings: vec![("exhibit_title".into(), "Threads".into())],
            stories: vec![],
        };
        write_project_data(tmp.path(), &record).unwrap();
        let value: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("project.json")).unwrap())
                .unwrap();
        assert_eq!(value["exhibit_title"], "Threads");
        assert!(value["stories"].as_array().unwrap().is_empty());
    }
}
