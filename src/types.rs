//! Shared value types used across all pipeline stages.
//!
//! The central type is [`Row`]: one tabular record as an ordered mapping from
//! column name to string value. Transformers never mutate rows in place —
//! each rule consumes a `Row` and returns a new one plus any warnings it
//! emitted, so every validation rule can be tested in isolation.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One tabular row: column name → string value, in source column order.
///
/// Column order is preserved through serialization so that regenerated JSON
/// documents are byte-identical across runs on unchanged input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs, keeping the given order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a column, or `""` when the column is absent.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.iter().any(|(k, _)| k == column)
    }

    /// Replace the value of an existing column, or append a new one.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| k == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    /// Remove a column, returning its value if it was present.
    pub fn remove(&mut self, column: &str) -> Option<String> {
        let idx = self.position(column)?;
        Some(self.cells.remove(idx).1)
    }

    /// Index of a column in source order.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.cells.iter().position(|(k, _)| k == column)
    }

    /// Insert a column at a specific position (clamped to the row length).
    pub fn insert_at(&mut self, index: usize, column: impl Into<String>, value: impl Into<String>) {
        let index = index.min(self.cells.len());
        self.cells.insert(index, (column.into(), value.into()));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every value is blank (whitespace-only counts as blank).
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of column names to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut cells = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            cells.push((k, v));
        }
        Ok(Row { cells })
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Row, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

/// Category of an advisory warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A step references an object that does not exist in the catalog.
    ReferenceMissing,
    /// A referenced resource (local image, markdown fragment) is absent.
    AssetMissing,
    /// A remote IIIF manifest failed validation.
    RemoteManifestInvalid,
}

/// Which part of a step a warning is about. Serialized as `type` — the
/// viewer routes `object` warnings to the image area and `panel` warnings to
/// the layer panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSource {
    Object,
    Panel,
}

/// An advisory warning attached to a step and surfaced in generated output.
///
/// Warnings never block generation — they are additive metadata the renderer
/// uses to make authoring errors visible to end users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Step identifier for diagnostics (not required to be unique).
    pub step: String,
    #[serde(rename = "type")]
    pub source: WarningSource,
    pub kind: WarningKind,
    pub message: String,
}

/// One entry of the ordered story list declared in the project file.
///
/// `number` is used downstream as a filename and lookup key and must be
/// unique within the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryDescriptor {
    pub number: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
}

/// Whether a key is safe to embed in an output filename.
///
/// Keys become `<key>.md` / `story-<key>.json` on disk, so anything that
/// could traverse directories is rejected at validation time rather than
/// passed through to the filesystem.
pub fn filesystem_safe(key: &str) -> bool {
    !key.is_empty() && !key.contains(['/', '\\']) && !key.contains("..") && key != "."
}
