//! Project file transformation: site settings and the ordered story list.
//!
//! `project.csv` is a key/value sheet with two sections. Rows before the
//! `STORIES` marker are site-level settings; rows after it declare the
//! project's stories in presentation order:
//!
//! ```text
//! key,value,subtitle
//! exhibit_title,Threads of the Andes,
//! theme_color,#2c3e50,
//! STORIES,,
//! 1,The Loom,Where it all begins
//! 2,Dye and Color,
//! ```
//!
//! The record is rebuilt fully on every run; there is no partial update.

use crate::config::STORIES_MARKER;
use crate::tabular::{drop_blank_rows, drop_instruction_column};
use crate::types::{Row, StoryDescriptor, filesystem_safe};
use serde_json::{Map, Value};

/// The singleton configuration record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRecord {
    /// Site-level settings in declaration order.
    pub settings: Vec<(String, String)>,
    /// Ordered story descriptors; numbers are unique.
    pub stories: Vec<StoryDescriptor>,
}

impl ProjectRecord {
    /// The JSON shape the renderer consumes: one object holding every
    /// setting plus a `stories` array.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.settings {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        map.insert(
            "stories".to_string(),
            serde_json::to_value(&self.stories).unwrap_or_default(),
        );
        Value::Object(map)
    }

    pub fn story(&self, number: &str) -> Option<&StoryDescriptor> {
        self.stories.iter().find(|s| s.number == number)
    }
}

#[derive(Debug, Default)]
pub struct ProjectOutcome {
    pub record: ProjectRecord,
    pub diagnostics: Vec<String>,
}

/// Transform raw project rows into the configuration record.
///
/// Settings rows need both a key and a value; story rows need a number and
/// a title. Duplicate story numbers are skipped — the number becomes a
/// filename and lookup key downstream, so only the first declaration wins.
pub fn transform(rows: Vec<Row>) -> ProjectOutcome {
    let rows = drop_blank_rows(drop_instruction_column(rows));

    let mut outcome = ProjectOutcome::default();
    let mut in_stories = false;

    for row in rows {
        let key = row.value("key").trim().to_string();
        let value = row.value("value").trim().to_string();

        if key == STORIES_MARKER {
            in_stories = true;
            continue;
        }

        if !in_stories {
            if !key.is_empty() && !value.is_empty() {
                outcome.record.settings.push((key, value));
            }
            continue;
        }

        // Story section: key column carries the number, value the title.
        if key.is_empty() || value.is_empty() {
            continue;
        }
        if !filesystem_safe(&key) {
            outcome.diagnostics.push(format!(
                "story number \"{key}\" skipped: not usable as a filename"
            ));
            continue;
        }
        if outcome.record.story(&key).is_some() {
            outcome.diagnostics.push(format!(
                "duplicate story number \"{key}\" skipped: story numbers must be unique"
            ));
            continue;
        }
        let subtitle = row.value("subtitle").trim();
        outcome.record.stories.push(StoryDescriptor {
            number: key,
            title: value,
            subtitle: (!subtitle.is_empty()).then(|| subtitle.to_string()),
        });
    }

    outcome
}
