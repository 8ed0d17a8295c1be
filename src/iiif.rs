//! IIIF Presentation v3 manifest writer.
//!
//! Tiled objects live under `iiif/objects/<id>/`, one directory per object,
//! each holding the Image API `info.json` that the tiling step produced.
//! This module wraps every such directory in a `manifest.json` so viewers
//! that speak the Presentation API (UniversalViewer, Mirador) can load the
//! object directly. Tile generation itself is out of scope; a directory
//! without `info.json` is skipped with a diagnostic.
//!
//! The manifest is a fixed single-canvas shape:
//!
//! ```text
//! Manifest
//! └── Canvas
//!     └── AnnotationPage
//!         └── Annotation (motivation: painting)
//!             └── Image body
//!                 └── ImageService3 (profile: level0)
//! ```
//!
//! Label, summary, and the Creator/Period metadata entries come from the
//! catalog row matching the directory name, when one exists.

use crate::types::Row;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const INFO_FILE: &str = "info.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The slice of an Image API `info.json` the manifest needs.
#[derive(Deserialize, Debug, Clone)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Canonical image base URI, when the tiler recorded one.
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: LangMap,
    pub metadata: Vec<MetadataEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<LangMap>,
    pub items: Vec<Canvas>,
}

/// IIIF language map with English values only; the source spreadsheets
/// carry no language information.
#[derive(Serialize, Debug)]
pub struct LangMap {
    pub en: Vec<String>,
}

impl LangMap {
    fn new(value: &str) -> Self {
        Self {
            en: vec![value.to_string()],
        }
    }
}

#[derive(Serialize, Debug)]
pub struct MetadataEntry {
    pub label: LangMap,
    pub value: LangMap,
}

#[derive(Serialize, Debug)]
pub struct Canvas {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: LangMap,
    pub height: u32,
    pub width: u32,
    pub items: Vec<AnnotationPage>,
}

#[derive(Serialize, Debug)]
pub struct AnnotationPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub items: Vec<Annotation>,
}

#[derive(Serialize, Debug)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub motivation: &'static str,
    pub body: ImageBody,
    pub target: String,
}

#[derive(Serialize, Debug)]
pub struct ImageBody {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub format: &'static str,
    pub height: u32,
    pub width: u32,
    pub service: Vec<ImageService>,
}

#[derive(Serialize, Debug)]
pub struct ImageService {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub profile: &'static str,
}

/// Build the manifest document for one tiled object. Pure; writing is the
/// caller's concern.
pub fn build_manifest(
    base_url: &str,
    object_id: &str,
    info: &ImageInfo,
    catalog_row: Option<&Row>,
) -> Manifest {
    let prefix = format!("{base_url}/iiif/objects/{object_id}");
    let title = catalog_row
        .map(|row| row.value("title"))
        .filter(|t| !t.is_empty())
        .unwrap_or(object_id);
    let description = catalog_row
        .map(|row| row.value("description"))
        .filter(|d| !d.is_empty());

    let mut metadata = Vec::new();
    if let Some(row) = catalog_row {
        for (column, label) in [("creator", "Creator"), ("period", "Period")] {
            let value = row.value(column);
            if !value.is_empty() {
                metadata.push(MetadataEntry {
                    label: LangMap::new(label),
                    value: LangMap::new(value),
                });
            }
        }
    }

    let body_id = info
        .id
        .clone()
        .unwrap_or_else(|| format!("{prefix}/full/max/0/default.jpg"));

    Manifest {
        context: PRESENTATION_CONTEXT,
        id: format!("{prefix}/{MANIFEST_FILE}"),
        kind: "Manifest",
        label: LangMap::new(title),
        metadata,
        summary: description.map(LangMap::new),
        items: vec![Canvas {
            id: format!("{prefix}/canvas"),
            kind: "Canvas",
            label: LangMap::new(title),
            height: info.height,
            width: info.width,
            items: vec![AnnotationPage {
                id: format!("{prefix}/page"),
                kind: "AnnotationPage",
                items: vec![Annotation {
                    id: format!("{prefix}/annotation"),
                    kind: "Annotation",
                    motivation: "painting",
                    body: ImageBody {
                        id: body_id,
                        kind: "Image",
                        format: "image/jpeg",
                        height: info.height,
                        width: info.width,
                        service: vec![ImageService {
                            id: prefix.clone(),
                            kind: "ImageService3",
                            profile: "level0",
                        }],
                    },
                    target: format!("{prefix}/canvas"),
                }],
            }],
        }],
    }
}

#[derive(Debug, Default)]
pub struct ManifestReport {
    pub written: usize,
    pub diagnostics: Vec<String>,
}

/// Write `manifest.json` into every tiled object directory under
/// `iiif_dir`, enriching from the catalog rows where the directory name
/// matches an `object_id`.
pub fn write_manifests(
    iiif_dir: &Path,
    base_url: &str,
    catalog_rows: &[Row],
) -> Result<ManifestReport, ManifestError> {
    let mut report = ManifestReport::default();

    if !iiif_dir.is_dir() {
        report.diagnostics.push(format!(
            "tile directory not found: {}",
            iiif_dir.display()
        ));
        return Ok(report);
    }

    let mut object_dirs: Vec<PathBuf> = fs::read_dir(iiif_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    object_dirs.sort();

    for dir in &object_dirs {
        let Some(object_id) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let info_path = dir.join(INFO_FILE);
        if !info_path.is_file() {
            report.diagnostics.push(format!(
                "object \"{object_id}\": no {INFO_FILE}, manifest skipped"
            ));
            continue;
        }
        let info: ImageInfo = match serde_json::from_str(&fs::read_to_string(&info_path)?) {
            Ok(info) => info,
            Err(err) => {
                report.diagnostics.push(format!(
                    "object \"{object_id}\": unreadable {INFO_FILE} ({err}), manifest skipped"
                ));
                continue;
            }
        };

        let row = catalog_rows
            .iter()
            .find(|row| row.value("object_id") == object_id);
        let manifest = build_manifest(base_url, object_id, &info, row);
        let mut content = serde_json::to_string_pretty(&manifest)?;
        content.push('\n');
        fs::write(dir.join(MANIFEST_FILE), content)?;
        report.written += 1;
    }

    Ok(report)
}
